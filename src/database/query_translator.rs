use std::sync::Arc;

use tracing::debug;

use super::error::DatabaseError;
use super::store::{DocumentStore, FindQuery};
use crate::filter::{Filter, FilterOptions, FilterSpec, QueryPlan};
use crate::types::{Document, Page};

/// Runs declarative listing requests against one collection
#[derive(Clone)]
pub struct QueryTranslator {
    store: Arc<dyn DocumentStore>,
    collection: String,
    options: FilterOptions,
}

impl QueryTranslator {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>, options: FilterOptions) -> Self {
        Self {
            store,
            collection: collection.into(),
            options,
        }
    }

    /// Merge the caller's request over the server defaults and compile it
    pub fn translate(&self, caller: &FilterSpec, defaults: &FilterSpec) -> Result<QueryPlan, DatabaseError> {
        Ok(Filter::translate(caller, defaults, self.options.clone())?)
    }

    pub async fn execute(&self, plan: QueryPlan) -> Result<Page<Document>, DatabaseError> {
        self.execute_with(plan, |items| items).await
    }

    /// Count and fetch independently, then pass the fetched items through `transform`.
    ///
    /// `total` comes from a separate round trip and can disagree with `items` under concurrent writes.
    pub async fn execute_with<F>(&self, plan: QueryPlan, transform: F) -> Result<Page<Document>, DatabaseError>
    where
        F: FnOnce(Vec<Document>) -> Vec<Document> + Send,
    {
        let query = FindQuery {
            conditions: plan.conditions.clone(),
            sort: plan.sort.clone(),
            projection: plan.projection.clone(),
            skip: plan.skip(),
            limit: Some(plan.page_size),
        };

        let (total, items) = futures::future::try_join(
            self.store.count(&self.collection, &plan.conditions),
            self.store.find(&self.collection, query),
        )
        .await?;

        debug!(
            "Listed {} of {} documents from {} (page {})",
            items.len(),
            total,
            self.collection,
            plan.page
        );

        Ok(Page {
            items: transform(items),
            page: plan.page,
            page_size: plan.page_size,
            total,
        })
    }
}
