use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::error::DatabaseError;
use super::ids::IdGenerator;
use super::query_translator::QueryTranslator;
use super::store::{DocumentStore, FindQuery};
use crate::filter::{Condition, FilterOptions, FilterSpec, Projection};
use crate::types::{now_millis, Document, Identifier, Page, CREATED_AT_FIELD, INTERNAL_ID_FIELD, UPDATED_AT_FIELD};

/// CRUD by application id over one collection
#[derive(Clone)]
pub struct Repository {
    collection: String,
    id_field: String,
    unique_fields: Vec<String>,
    store: Arc<dyn DocumentStore>,
    ids: IdGenerator,
    translator: QueryTranslator,
}

impl Repository {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        id_field: impl Into<String>,
        ids: IdGenerator,
        options: FilterOptions,
    ) -> Self {
        let collection = collection.into();
        Self {
            translator: QueryTranslator::new(store.clone(), collection.clone(), options),
            collection,
            id_field: id_field.into(),
            unique_fields: Vec::new(),
            store,
            ids,
        }
    }

    /// Declare another field that must be unique across the collection
    pub fn with_unique(mut self, field: impl Into<String>) -> Self {
        self.unique_fields.push(field.into());
        self
    }

    /// Create the backing collection with its application key and any other unique fields
    pub async fn init(&self) -> Result<(), DatabaseError> {
        let keys: Vec<&str> = std::iter::once(self.id_field.as_str())
            .chain(self.unique_fields.iter().map(String::as_str))
            .collect();
        self.store.ensure_collection(&self.collection, &keys).await
    }

    /// Insert a new document under a freshly generated id.
    ///
    /// Collisions on the id are retried with a new id; any other conflict is returned.
    pub async fn create(&self, fields: Document) -> Result<Identifier, DatabaseError> {
        if fields.is_empty() {
            return Err(DatabaseError::validation("Cannot create an empty document"));
        }

        let now = now_millis();
        let mut doc = fields;
        doc.remove(INTERNAL_ID_FIELD);
        doc.insert(CREATED_AT_FIELD.to_string(), Value::from(now));
        doc.insert(UPDATED_AT_FIELD.to_string(), Value::from(now));

        for attempt in 1..=self.ids.max_attempts() {
            let id = self.ids.next_id();
            doc.insert(self.id_field.clone(), Value::from(id));

            match self.store.insert(&self.collection, doc.clone()).await {
                Ok(()) => {
                    debug!("Created {} {}={}", self.collection, self.id_field, id);
                    return Ok(id);
                }
                Err(e) if e.is_conflict_on(&self.id_field) => {
                    warn!("Id collision on {} (attempt {}), retrying", self.collection, attempt);
                }
                Err(e) => return Err(e),
            }
        }

        Err(DatabaseError::IdExhausted(self.ids.max_attempts()))
    }

    /// Deleting an absent document succeeds
    pub async fn delete_by_id(&self, id: Option<Identifier>) -> Result<(), DatabaseError> {
        let id = require_id(id)?;
        self.store.delete_one(&self.collection, &self.by_id(id)).await?;
        Ok(())
    }

    /// `$set` the given fields and stamp `updatedAt`; returns the applied set
    pub async fn update_by_id(&self, id: Option<Identifier>, fields: Document) -> Result<Document, DatabaseError> {
        let id = require_id(id)?;

        let mut set = fields;
        set.remove(INTERNAL_ID_FIELD);
        set.remove(&self.id_field);
        set.remove(CREATED_AT_FIELD);
        set.insert(UPDATED_AT_FIELD.to_string(), Value::from(now_millis()));

        self.store.update_one(&self.collection, &self.by_id(id), set.clone()).await?;
        Ok(set)
    }

    /// Bump a numeric counter without touching `updatedAt`; returns the new value
    pub async fn increment_by_id(&self, id: Identifier, field: &str, current: i64) -> Result<i64, DatabaseError> {
        let next = current.saturating_add(1);
        let mut set = Document::new();
        set.insert(field.to_string(), Value::from(next));
        self.store.update_one(&self.collection, &self.by_id(id), set).await?;
        Ok(next)
    }

    pub async fn get_by_id(&self, id: Option<Identifier>) -> Result<Document, DatabaseError> {
        let id = require_id(id)?;
        self.find_one(self.by_id(id), Projection::default())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {} not found", self.collection, id)))
    }

    pub async fn find_one(&self, conditions: Vec<Condition>, projection: Projection) -> Result<Option<Document>, DatabaseError> {
        let query = FindQuery::matching(conditions).with_projection(projection).with_limit(1);
        Ok(self.store.find(&self.collection, query).await?.into_iter().next())
    }

    pub async fn query(&self, caller: &FilterSpec, defaults: &FilterSpec) -> Result<Page<Document>, DatabaseError> {
        self.query_with(caller, defaults, |items| items).await
    }

    pub async fn query_with<F>(&self, caller: &FilterSpec, defaults: &FilterSpec, transform: F) -> Result<Page<Document>, DatabaseError>
    where
        F: FnOnce(Vec<Document>) -> Vec<Document> + Send,
    {
        let plan = self.translator.translate(caller, defaults)?;
        self.translator.execute_with(plan, transform).await
    }

    fn by_id(&self, id: Identifier) -> Vec<Condition> {
        vec![Condition::equals(self.id_field.clone(), Value::from(id))]
    }
}

fn require_id(id: Option<Identifier>) -> Result<Identifier, DatabaseError> {
    id.ok_or_else(|| DatabaseError::validation("id is required"))
}

/// Accept an application id given as a JSON number or a numeric string
pub fn parse_identifier(value: &Value) -> Option<Identifier> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
