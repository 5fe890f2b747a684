pub mod audit;
pub mod document;
pub mod driver;
pub mod job;
pub mod location;
pub mod notification;
pub mod user;

pub use audit::AuditLog;
pub use document::Document;
pub use driver::Driver;
pub use job::Job;
pub use location::DriverLocation;
pub use notification::Notification;
pub use user::User;
