pub mod auth;
pub mod client_format;
pub mod rate_limit;
pub mod response;

pub use auth::{jwt_auth_middleware, require_admin_middleware, AuthUser, BearerToken, GateState};
pub use client_format::{detect_client_format_middleware, ClientFormat, ClientGeneration};
pub use rate_limit::{rate_limit_middleware, QuotaClass, QuotaState, QuotaTracker};
pub use response::{format_response_middleware, transform_body};
