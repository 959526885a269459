use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use tracing::info;

use super::error::DatabaseError;
use super::store::{DocumentStore, FindQuery};
use crate::filter::filter_sql::FilterSql;
use crate::filter::{Condition, SqlParam, SqlResult};
use crate::types::Document;

/// PostgreSQL backend: one table per collection, documents held in a JSONB column
pub struct PgDocumentStore {
    pool: PgPool,
    unique_keys: RwLock<HashMap<String, Vec<String>>>,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            unique_keys: RwLock::new(HashMap::new()),
        }
    }

    /// Open a pool against `database_url`
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, DatabaseError> {
        url::Url::parse(database_url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Created database pool (max {} connections)", max_connections);
        Ok(Self::new(pool))
    }

    async fn execute(&self, sql: SqlResult) -> Result<u64, DatabaseError> {
        let mut q = sqlx::query(&sql.query);
        for p in sql.params {
            q = bind_param(q, p);
        }
        Ok(q.execute(&self.pool).await?.rows_affected())
    }
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    p: SqlParam,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match p {
        SqlParam::Text(s) => q.bind(s),
        SqlParam::Json(v) => q.bind(v),
        SqlParam::BigInt(i) => q.bind(i),
    }
}

/// `23505` names the violated index; map it back to the key it guards
fn map_unique_violation(err: sqlx::Error, collection: &str, unique_keys: &[String]) -> DatabaseError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            let key = unique_keys
                .iter()
                .find(|k| db_err.constraint() == Some(FilterSql::unique_index_name(collection, k).as_str()))
                .or_else(|| unique_keys.first())
                .cloned()
                .unwrap_or_default();
            DatabaseError::Conflict {
                collection: collection.to_string(),
                key,
            }
        }
        _ => DatabaseError::Sqlx(err),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn ensure_collection(&self, collection: &str, unique_keys: &[&str]) -> Result<(), DatabaseError> {
        for statement in FilterSql::create_collection(collection, unique_keys)? {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        self.unique_keys
            .write()
            .await
            .insert(collection.to_string(), unique_keys.iter().map(|k| k.to_string()).collect());
        info!("Ensured collection {} (unique on {})", collection, unique_keys.join(", "));
        Ok(())
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<(), DatabaseError> {
        let unique_keys = self
            .unique_keys
            .read()
            .await
            .get(collection)
            .cloned()
            .ok_or_else(|| DatabaseError::InvalidCollection(collection.to_string()))?;
        let sql = FilterSql::insert(collection, &doc)?;
        self.execute(sql)
            .await
            .map(|_| ())
            .map_err(|e| match e {
                DatabaseError::Sqlx(err) => map_unique_violation(err, collection, &unique_keys),
                other => other,
            })
    }

    async fn find(&self, collection: &str, query: FindQuery) -> Result<Vec<Document>, DatabaseError> {
        let sql = FilterSql::select(collection, &query.conditions, &query.sort, query.skip, query.limit)?;
        let mut q = sqlx::query(&sql.query);
        for p in sql.params {
            q = bind_param(q, p);
        }

        let rows = q.fetch_all(&self.pool).await?;
        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let value: Value = row.try_get("doc")?;
            if let Value::Object(doc) = value {
                docs.push(query.projection.apply(doc));
            }
        }
        Ok(docs)
    }

    async fn count(&self, collection: &str, conditions: &[Condition]) -> Result<u64, DatabaseError> {
        let sql = FilterSql::count(collection, conditions)?;
        let mut q = sqlx::query(&sql.query);
        for p in sql.params {
            q = bind_param(q, p);
        }
        let row = q.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn update_one(&self, collection: &str, conditions: &[Condition], set: Document) -> Result<u64, DatabaseError> {
        self.execute(FilterSql::update_one(collection, conditions, &set)?).await
    }

    async fn delete_one(&self, collection: &str, conditions: &[Condition]) -> Result<u64, DatabaseError> {
        self.execute(FilterSql::delete_one(collection, conditions)?).await
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }

    /// Pings the pool to ensure connectivity
    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
