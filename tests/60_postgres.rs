use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use blog_api_rust::database::{DocumentStore, IdGenerator, PgDocumentStore, Repository};
use blog_api_rust::filter::{FilterOptions, FilterSpec, SearchOp, SortDirection};
use blog_api_rust::types::Document;

/// Runs only against a live database: set DATABASE_URL to enable
async fn pool() -> Result<Option<PgPool>> {
    let Some(url) = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()) else {
        eprintln!("DATABASE_URL not set, skipping Postgres store tests");
        return Ok(None);
    };
    Ok(Some(PgPoolOptions::new().max_connections(2).connect(&url).await?))
}

fn table(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap_or_default()
}

async fn drop_table(pool: &PgPool, name: &str) -> Result<()> {
    sqlx::query(&format!("DROP TABLE IF EXISTS \"{}\"", name)).execute(pool).await?;
    Ok(())
}

#[tokio::test]
async fn insert_reports_the_violated_key() -> Result<()> {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let name = table("users");
    let store = PgDocumentStore::new(pool.clone());
    store.ensure_collection(&name, &["userId", "username"]).await?;

    store.insert(&name, doc(json!({ "userId": 1, "username": "neo" }))).await?;

    let by_id = store.insert(&name, doc(json!({ "userId": 1, "username": "trinity" }))).await;
    let by_name = store.insert(&name, doc(json!({ "userId": 2, "username": "neo" }))).await;
    let count = store.count(&name, &[]).await?;
    drop_table(&pool, &name).await?;

    assert!(by_id.unwrap_err().is_conflict_on("userId"));
    assert!(by_name.unwrap_err().is_conflict_on("username"));
    assert_eq!(count, 1);
    Ok(())
}

#[tokio::test]
async fn update_and_increment_round() -> Result<()> {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let name = table("blogs");
    let store: Arc<dyn DocumentStore> = Arc::new(PgDocumentStore::new(pool.clone()));
    let repo = Repository::new(store, name.clone(), "id", IdGenerator::default(), FilterOptions::default());
    repo.init().await?;

    let id = repo.create(doc(json!({ "title": "first", "reads": 0 }))).await?;
    repo.update_by_id(Some(id), doc(json!({ "title": "second" }))).await?;
    let reads = repo.increment_by_id(id, "reads", 0).await?;
    let stored = repo.get_by_id(Some(id)).await?;
    drop_table(&pool, &name).await?;

    assert_eq!(reads, 1);
    assert_eq!(stored["title"], json!("second"));
    assert_eq!(stored["reads"], json!(1));
    assert!(!stored.contains_key("_id"));
    Ok(())
}

#[tokio::test]
async fn paged_search_matches_array_elements() -> Result<()> {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let name = table("blogs");
    let store: Arc<dyn DocumentStore> = Arc::new(PgDocumentStore::new(pool.clone()));
    let repo = Repository::new(store, name.clone(), "id", IdGenerator::default(), FilterOptions::default());
    repo.init().await?;

    for i in 0..25 {
        let tags = if i % 2 == 0 { json!(["even", "rust"]) } else { json!(["odd"]) };
        repo.create(doc(json!({ "seq": i, "tags": tags, "status": if i < 3 { "" } else { "live" } })))
            .await?;
    }

    let by_seq = FilterSpec::new().sort_by("seq", SortDirection::Asc);
    let rust = repo
        .query(&by_seq.clone().search("tags", SearchOp::In, "rust").paged(2, 5), &FilterSpec::new())
        .await;
    let not_odd = repo
        .query(&by_seq.clone().search("tags", SearchOp::NotIn, "odd"), &FilterSpec::new())
        .await;
    let like = repo
        .query(&by_seq.clone().search("tags", SearchOp::Like, "^ru"), &FilterSpec::new())
        .await;
    let live = repo
        .query(&by_seq.clone().search("status", SearchOp::NotIn, "draft"), &FilterSpec::new())
        .await;
    let far = repo
        .query(&by_seq.paged(100_000_000_000_000_000, 100), &FilterSpec::new())
        .await;
    drop_table(&pool, &name).await?;

    let rust = rust?;
    assert_eq!(rust.total, 13);
    let seqs: Vec<i64> = rust.items.iter().filter_map(|d| d["seq"].as_i64()).collect();
    assert_eq!(seqs, vec![10, 12, 14, 16, 18]);

    assert_eq!(not_odd?.total, 13);
    assert_eq!(like?.total, 13);
    assert_eq!(live?.total, 22);

    let far = far?;
    assert!(far.items.is_empty());
    assert_eq!(far.total, 25);
    Ok(())
}
