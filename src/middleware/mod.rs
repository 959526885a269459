pub mod auth;
pub mod response;

pub use auth::{optional_session, require_session};
pub use response::{ApiResponse, ApiResult};
