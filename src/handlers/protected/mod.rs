pub mod auth;
pub mod documents;
pub mod drivers;
pub mod jobs;
pub mod notifications;
