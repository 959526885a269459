/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored document: a JSON object keyed by field name
pub type Document = Map<String, Value>;

/// Application-level identifier assigned by the repository.
/// Never the storage-internal row id.
pub type Identifier = i64;

/// Field that holds the storage-internal identifier. Every projection suppresses it.
pub const INTERNAL_ID_FIELD: &str = "_id";

/// Field stamped with the creation instant (epoch milliseconds)
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Field stamped on every write (epoch milliseconds)
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// One page of a listing plus the total number of matches before paging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(rename = "list")]
    pub items: Vec<T>,
    #[serde(rename = "current")]
    pub page: u64,
    #[serde(rename = "pageSize")]
    pub page_size: u64,
    pub total: u64,
}

/// Current instant as epoch milliseconds, the timestamp unit stored in documents
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
