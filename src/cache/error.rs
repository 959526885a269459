use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}
