use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::entry::SessionEntry;
use super::error::CacheError;
use super::CacheStore;
use crate::types::Document;

/// Fixed key written by a "remember me" login, shared by every user who ticks the box
pub const REMEMBER_ME_KEY: &str = "userInfo";

/// Identity key → denormalized user record, the source of truth for "who is calling"
#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn CacheStore>,
    max_age: Duration,
    remember_ttl: Duration,
}

impl SessionCache {
    pub fn new(store: Arc<dyn CacheStore>, max_age: Duration, remember_ttl: Duration) -> Self {
        Self {
            store,
            max_age,
            remember_ttl,
        }
    }

    pub async fn get(&self, identity_key: &str) -> Result<Option<SessionEntry>, CacheError> {
        Ok(self
            .store
            .get(identity_key)
            .await?
            .and_then(|entry| SessionEntry::from_cache(identity_key, entry)))
    }

    /// Full overwrite; `None` keeps the entry until it is deleted
    pub async fn set(&self, identity_key: &str, payload: Document, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.store.set(identity_key, Value::Object(payload), ttl).await
    }

    pub async fn delete(&self, identity_key: &str) -> Result<bool, CacheError> {
        self.store.delete(identity_key).await
    }

    /// Start a session that lasts the configured max-age
    pub async fn open(&self, identity_key: &str, payload: Document) -> Result<(), CacheError> {
        self.set(identity_key, payload, Some(self.max_age)).await
    }

    pub async fn remember(&self, payload: Document) -> Result<(), CacheError> {
        self.set(REMEMBER_ME_KEY, payload, Some(self.remember_ttl)).await
    }

    /// Fetch, overlay `patch`, write back with a fresh max-age.
    ///
    /// Not atomic: two concurrent refreshes race and the later `set` wins.
    /// Returns the merged payload, or `None` when there was no session to refresh.
    pub async fn refresh(&self, identity_key: &str, patch: &Document) -> Result<Option<Document>, CacheError> {
        let Some(session) = self.get(identity_key).await? else {
            return Ok(None);
        };

        let mut payload = session.payload;
        for (key, value) in patch {
            payload.insert(key.clone(), value.clone());
        }

        self.open(identity_key, payload.clone()).await?;
        Ok(Some(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use serde_json::json;

    fn sessions(max_age_ms: u64) -> SessionCache {
        SessionCache::new(
            Arc::new(MemoryCache::new()),
            Duration::from_millis(max_age_ms),
            Duration::from_secs(30 * 24 * 3600),
        )
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn open_applies_max_age() {
        let cache = sessions(40);
        cache.open("7", doc(json!({ "userId": 7 }))).await.unwrap();

        let session = cache.get("7").await.unwrap().unwrap();
        assert_eq!(session.identity_key, "7");
        assert!(session.expires_at.is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get("7").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remember_writes_the_fixed_key() {
        let cache = sessions(1000);
        cache.remember(doc(json!({ "userId": 7 }))).await.unwrap();

        let remembered = cache.get(REMEMBER_ME_KEY).await.unwrap().unwrap();
        assert_eq!(remembered.payload["userId"], json!(7));
    }

    #[tokio::test]
    async fn refresh_merges_over_cached_payload() {
        let cache = sessions(1000);
        cache
            .open("7", doc(json!({ "userId": 7, "nickname": "old", "avatar": "a.png" })))
            .await
            .unwrap();

        let merged = cache.refresh("7", &doc(json!({ "nickname": "new" }))).await.unwrap().unwrap();
        assert_eq!(merged["nickname"], json!("new"));
        assert_eq!(merged["avatar"], json!("a.png"));

        let stored = cache.get("7").await.unwrap().unwrap();
        assert_eq!(stored.payload, merged);
    }

    #[tokio::test]
    async fn refresh_without_session_is_a_no_op() {
        let cache = sessions(1000);
        assert!(cache.refresh("8", &Document::new()).await.unwrap().is_none());
        assert!(cache.get("8").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_ends_the_session() {
        let cache = sessions(1000);
        cache.open("7", doc(json!({ "userId": 7 }))).await.unwrap();
        assert!(cache.delete("7").await.unwrap());
        assert!(cache.get("7").await.unwrap().is_none());
    }
}
