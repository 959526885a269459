use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::entry::CacheEntry;
use super::error::CacheError;
use super::MAX_KEY_LENGTH;
use crate::types::now_millis;

/// Key/value cache with optional per-entry expiry.
///
/// `set` always overwrites the whole value and resets the TTL. There is no partial update.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Returns whether an entry was removed
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Drop every expired entry; returns how many were removed
    async fn purge_expired(&self) -> Result<usize, CacheError>;
}

/// In-process cache. Expired entries are evicted on read and by the sweep task.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn validate_key(key: &str) -> Result<(), CacheError> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let now = now_millis();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired_at(now) => return Ok(Some(entry.clone())),
                Some(_) => {}
            }
        }

        // re-check under the write lock, a concurrent set may have replaced it
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.is_expired_at(now)) {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError> {
        validate_key(key)?;
        let entry = CacheEntry::new(value, ttl);
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = now_millis();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_get_delete() {
        let cache = MemoryCache::new();
        cache.set("k", json!({ "a": 1 }), None).await.unwrap();

        let entry = cache.get("k").await.unwrap().unwrap();
        assert_eq!(entry.value, json!({ "a": 1 }));
        assert!(entry.expires_at.is_none());

        assert!(cache.delete("k").await.unwrap());
        assert!(!cache.delete("k").await.unwrap());
        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent_and_are_evicted() {
        let cache = MemoryCache::new();
        cache.set("k", json!(1), Some(Duration::from_millis(30))).await.unwrap();
        assert!(cache.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.get("k").await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn overwrite_resets_ttl() {
        let cache = MemoryCache::new();
        cache.set("k", json!(1), Some(Duration::from_millis(80))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        cache.set("k", json!(2), Some(Duration::from_millis(80))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let entry = cache.get("k").await.unwrap().unwrap();
        assert_eq!(entry.value, json!(2));
    }

    #[tokio::test]
    async fn overwrite_without_ttl_never_expires() {
        let cache = MemoryCache::new();
        cache.set("k", json!(1), Some(Duration::from_millis(20))).await.unwrap();
        cache.set("k", json!(2), None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn purge_removes_only_expired() {
        let cache = MemoryCache::new();
        cache.set("short", json!(1), Some(Duration::from_millis(10))).await.unwrap();
        cache.set("long", json!(1), Some(Duration::from_secs(60))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.purge_expired().await.unwrap(), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn rejects_bad_keys() {
        let cache = MemoryCache::new();
        assert!(cache.set("", json!(1), None).await.is_err());
        assert!(cache.set(&"x".repeat(MAX_KEY_LENGTH + 1), json!(1), None).await.is_err());
    }
}
