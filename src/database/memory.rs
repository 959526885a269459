use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::DatabaseError;
use super::store::{DocumentStore, FindQuery};
use crate::filter::filter_order::FilterOrder;
use crate::filter::Condition;
use crate::types::{Document, INTERNAL_ID_FIELD};

struct Collection {
    unique_keys: Vec<String>,
    documents: Vec<Document>,
}

/// Round trips seen by a `MemoryStore`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub reads: u64,
    pub writes: u64,
}

/// In-process document store. Default backend when no `DATABASE_URL` is configured.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }

    fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }
}

fn matches_all(doc: &Document, conditions: &[Condition]) -> bool {
    conditions.iter().all(|c| c.matches(doc))
}

fn unknown(collection: &str) -> DatabaseError {
    DatabaseError::InvalidCollection(collection.to_string())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ensure_collection(&self, collection: &str, unique_keys: &[&str]) -> Result<(), DatabaseError> {
        let mut collections = self.collections.write().await;
        let coll = collections.entry(collection.to_string()).or_insert_with(|| Collection {
            unique_keys: Vec::new(),
            documents: Vec::new(),
        });
        for key in unique_keys {
            if !coll.unique_keys.iter().any(|k| k == key) {
                coll.unique_keys.push(key.to_string());
            }
        }
        Ok(())
    }

    async fn insert(&self, collection: &str, mut doc: Document) -> Result<(), DatabaseError> {
        self.record_write();
        let mut collections = self.collections.write().await;
        let coll = collections.get_mut(collection).ok_or_else(|| unknown(collection))?;

        for key in &coll.unique_keys {
            let Some(value) = doc.get(key).filter(|v| !v.is_null()) else {
                continue;
            };
            if coll.documents.iter().any(|d| d.get(key) == Some(value)) {
                return Err(DatabaseError::Conflict {
                    collection: collection.to_string(),
                    key: key.clone(),
                });
            }
        }

        doc.insert(INTERNAL_ID_FIELD.to_string(), Value::String(Uuid::new_v4().simple().to_string()));
        coll.documents.push(doc);
        Ok(())
    }

    async fn find(&self, collection: &str, query: FindQuery) -> Result<Vec<Document>, DatabaseError> {
        self.record_read();
        let collections = self.collections.read().await;
        let coll = collections.get(collection).ok_or_else(|| unknown(collection))?;

        let mut matched: Vec<&Document> = coll
            .documents
            .iter()
            .filter(|d| matches_all(d, &query.conditions))
            .collect();

        if !query.sort.is_empty() {
            // stable sort keeps insertion order between equal keys
            matched.sort_by(|a, b| FilterOrder::compare(a, b, &query.sort));
        }

        let limit = query.limit.map_or(usize::MAX, |l| l as usize);
        Ok(matched
            .into_iter()
            .skip(query.skip as usize)
            .take(limit)
            .map(|d| query.projection.apply(d.clone()))
            .collect())
    }

    async fn count(&self, collection: &str, conditions: &[Condition]) -> Result<u64, DatabaseError> {
        self.record_read();
        let collections = self.collections.read().await;
        let coll = collections.get(collection).ok_or_else(|| unknown(collection))?;
        Ok(coll.documents.iter().filter(|d| matches_all(d, conditions)).count() as u64)
    }

    async fn update_one(&self, collection: &str, conditions: &[Condition], set: Document) -> Result<u64, DatabaseError> {
        self.record_write();
        let mut collections = self.collections.write().await;
        let coll = collections.get_mut(collection).ok_or_else(|| unknown(collection))?;

        match coll.documents.iter_mut().find(|d| matches_all(d, conditions)) {
            Some(doc) => {
                for (key, value) in set {
                    if key != INTERNAL_ID_FIELD {
                        doc.insert(key, value);
                    }
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_one(&self, collection: &str, conditions: &[Condition]) -> Result<u64, DatabaseError> {
        self.record_write();
        let mut collections = self.collections.write().await;
        let coll = collections.get_mut(collection).ok_or_else(|| unknown(collection))?;

        match coll.documents.iter().position(|d| matches_all(d, conditions)) {
            Some(index) => {
                coll.documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
