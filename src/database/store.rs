use async_trait::async_trait;

use super::error::DatabaseError;
use crate::filter::{Condition, FilterOrderInfo, Projection};
use crate::types::Document;

/// Read request against one collection
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    pub conditions: Vec<Condition>,
    pub sort: Vec<FilterOrderInfo>,
    pub projection: Projection,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindQuery {
    pub fn matching(conditions: Vec<Condition>) -> Self {
        Self {
            conditions,
            ..Default::default()
        }
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Collection-oriented document store.
///
/// Every collection carries one or more unique keys, the application id first.
/// `insert` reports a collision on any of them as `DatabaseError::Conflict`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ensure_collection(&self, collection: &str, unique_keys: &[&str]) -> Result<(), DatabaseError>;

    async fn insert(&self, collection: &str, doc: Document) -> Result<(), DatabaseError>;

    async fn find(&self, collection: &str, query: FindQuery) -> Result<Vec<Document>, DatabaseError>;

    async fn count(&self, collection: &str, conditions: &[Condition]) -> Result<u64, DatabaseError>;

    /// `$set` the given top-level fields on the first match; returns the number of documents touched
    async fn update_one(&self, collection: &str, conditions: &[Condition], set: Document) -> Result<u64, DatabaseError>;

    async fn delete_one(&self, collection: &str, conditions: &[Condition]) -> Result<u64, DatabaseError>;

    /// Backend name reported by the health endpoint
    fn backend(&self) -> &'static str;

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
