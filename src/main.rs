use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use blog_api_rust::app::{self, AppState};
use blog_api_rust::cache::{spawn_cleanup_task, CacheStore, MemoryCache};
use blog_api_rust::config;
use blog_api_rust::database::{DocumentStore, MemoryStore, PgDocumentStore};

#[derive(Parser, Debug)]
#[command(name = "blog-api-rust", version, about = "Blog and user API server")]
struct Args {
    /// Port to listen on (overrides config, PORT and SERVER_PORT)
    #[arg(short, long, env = "BLOG_API_PORT")]
    port: Option<u16>,

    /// YAML file layered over the environment profile
    #[arg(short, long, env = "APP_CONFIG_FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if let Some(path) = &args.config {
        std::env::set_var("APP_CONFIG_FILE", path);
    }

    let config = config::init().context("failed to load configuration")?;
    info!("Starting Blog API in {:?} mode", config.environment);

    let store: Arc<dyn DocumentStore> = match &config.database.url {
        Some(url) => Arc::new(
            PgDocumentStore::connect(url, config.database.max_connections)
                .await
                .context("failed to connect to PostgreSQL")?,
        ),
        None => {
            warn!("DATABASE_URL not set, documents live in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
    let sweeper = spawn_cleanup_task(cache.clone(), Duration::from_secs(config.session.sweep_interval_secs.max(1)));

    tokio::fs::create_dir_all(&config.storage.root)
        .await
        .with_context(|| format!("cannot create storage root {}", config.storage.root.display()))?;

    let state = AppState::build(config, store, cache)
        .await
        .context("failed to initialise application state")?;
    let app = app::router(state, config);

    let port = args.port.unwrap_or(config.server.port);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Blog API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweeper.abort();
    info!("Blog API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
