use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::CacheStore;

/// Spawn a task that purges expired entries every `interval`.
///
/// Abort the returned handle on shutdown.
pub fn spawn_cleanup_task(cache: Arc<dyn CacheStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting cache sweep every {:?}", interval);
        loop {
            tokio::time::sleep(interval).await;
            match cache.purge_expired().await {
                Ok(0) => debug!("Cache sweep: nothing expired"),
                Ok(removed) => info!("Cache sweep: removed {} expired entries", removed),
                Err(e) => warn!("Cache sweep failed: {}", e),
            }
        }
    })
}
