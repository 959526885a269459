use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{now_millis, Document};

/// A cached value with its creation and expiry instants (epoch milliseconds)
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: Value,
    pub created_at: i64,
    /// `None` never expires
    pub expires_at: Option<i64>,
}

impl CacheEntry {
    pub fn new(value: Value, ttl: Option<Duration>) -> Self {
        let now = now_millis();
        Self {
            value,
            created_at: now,
            expires_at: ttl.map(|ttl| now.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))),
        }
    }

    /// Expired once the current time reaches the expiry instant
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|expires| now_ms >= expires)
    }
}

/// The cached view of the caller, keyed by identity key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    pub identity_key: String,
    pub payload: Document,
    pub expires_at: Option<i64>,
}

impl SessionEntry {
    pub fn from_cache(identity_key: &str, entry: CacheEntry) -> Option<Self> {
        match entry.value {
            Value::Object(payload) => Some(Self {
                identity_key: identity_key.to_string(),
                payload,
                expires_at: entry.expires_at,
            }),
            _ => None,
        }
    }
}
