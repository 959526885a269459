pub mod local;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::types::now_millis;

pub use local::LocalObjectStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Empty upload")]
    EmptyUpload,

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl Upload {
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    /// File extension derived from the MIME subtype, `image/png` → `png`
    pub fn extension(&self) -> String {
        let subtype = self
            .content_type
            .split(';')
            .next()
            .and_then(|mime| mime.split('/').nth(1))
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match subtype.as_str() {
            "jpeg" => "jpg".to_string(),
            "svg+xml" => "svg".to_string(),
            s if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()) => s.to_string(),
            _ => "bin".to_string(),
        }
    }
}

/// Unique key under `folder` for a new object, e.g. `avatar/avatar_1700000000000_<uuid>.png`
pub fn object_key(folder: &str, prefix: &str, upload: &Upload) -> String {
    format!(
        "{}/{}{}_{}.{}",
        folder,
        prefix,
        now_millis(),
        Uuid::new_v4().simple(),
        upload.extension()
    )
}

/// Blob store addressed by slash-separated keys, returning public URLs
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, upload: &Upload) -> Result<String, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Reverse of the URL returned by `put`; `None` for URLs this storage did not issue
    fn key_for_url(&self, url: &str) -> Option<String>;
}
