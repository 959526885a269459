use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Unsupported search operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid pattern for field '{field}': {reason}")]
    InvalidPattern { field: String, reason: String },

    #[error("Invalid date bound for field '{field}': {value}")]
    InvalidDate { field: String, value: String },

    #[error("Invalid projection value: {0}")]
    InvalidProjection(String),

    #[error("Projection cannot mix inclusion and exclusion (field '{0}')")]
    MixedProjection(String),
}
