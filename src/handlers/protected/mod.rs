pub mod blog;
pub mod upload;
pub mod user;
