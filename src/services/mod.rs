pub mod blog_service;
pub mod error;
pub mod upload_service;
pub mod user_service;
pub mod validate;

pub use blog_service::BlogService;
pub use error::{ServiceError, ServiceResult};
pub use upload_service::UploadService;
pub use user_service::{AuthPayload, Credentials, UserService};
