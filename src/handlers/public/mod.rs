pub mod blog;
pub mod home;
pub mod user;
