pub mod blog;
pub mod user;

pub use blog::{Blog, Editor};
pub use user::User;
