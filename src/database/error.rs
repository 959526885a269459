use thiserror::Error;

use crate::filter::FilterError;

/// Errors from the document store backends and the repository
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Caller input rejected before reaching the store
    #[error("{message}")]
    Validation { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique key collision on insert
    #[error("Duplicate value for '{key}' in collection '{collection}'")]
    Conflict { collection: String, key: String },

    #[error("Unknown collection: {0}")]
    InvalidCollection(String),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Could not allocate a unique id after {0} attempts")]
    IdExhausted(u32),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    pub fn validation(message: impl Into<String>) -> Self {
        DatabaseError::Validation {
            status: 400,
            message: message.into(),
        }
    }

    pub fn is_conflict_on(&self, key: &str) -> bool {
        matches!(self, DatabaseError::Conflict { key: k, .. } if k == key)
    }
}
