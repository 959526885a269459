use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{ObjectStorage, StorageError, Upload};

/// Objects written below `root`, served back under `public_url`
pub struct LocalObjectStorage {
    root: PathBuf,
    public_url: String,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn put(&self, key: &str, upload: &Upload) -> Result<String, StorageError> {
        if upload.bytes.is_empty() {
            return Err(StorageError::EmptyUpload);
        }
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &upload.bytes).await?;

        debug!("Stored {} ({} bytes, {})", key, upload.bytes.len(), upload.content_type);
        Ok(format!("{}/{}", self.public_url, key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        let without_query = url.split(|c| c == '?' || c == '#').next().unwrap_or(url);
        without_query
            .strip_prefix(&self.public_url)
            .map(|rest| rest.trim_start_matches('/').to_string())
            .filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_writes_file_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalObjectStorage::new(dir.path(), "http://localhost:3000/public/");

        let url = storage
            .put("img/file_1.png", &Upload::new(b"png".to_vec(), "image/png"))
            .await
            .unwrap();

        assert_eq!(url, "http://localhost:3000/public/img/file_1.png");
        assert_eq!(std::fs::read(dir.path().join("img/file_1.png")).unwrap(), b"png");
        assert_eq!(storage.key_for_url(&format!("{}?v=2", url)).as_deref(), Some("img/file_1.png"));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalObjectStorage::new(dir.path(), "/public");
        storage.put("a/b.txt", &Upload::new(b"x".to_vec(), "text/plain")).await.unwrap();

        storage.delete("a/b.txt").await.unwrap();
        storage.delete("a/b.txt").await.unwrap();
        assert!(!dir.path().join("a/b.txt").exists());
    }

    #[tokio::test]
    async fn rejects_escaping_keys_and_empty_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalObjectStorage::new(dir.path(), "/public");
        let upload = Upload::new(b"x".to_vec(), "text/plain");

        assert!(matches!(storage.put("../evil", &upload).await, Err(StorageError::InvalidKey(_))));
        assert!(matches!(storage.put("/etc/passwd", &upload).await, Err(StorageError::InvalidKey(_))));
        assert!(matches!(
            storage.put("ok.txt", &Upload::new(Vec::new(), "text/plain")).await,
            Err(StorageError::EmptyUpload)
        ));
    }

    #[test]
    fn foreign_urls_have_no_key() {
        let storage = LocalObjectStorage::new("/tmp", "http://cdn.local/public");
        assert!(storage.key_for_url("https://elsewhere/avatar/x.png").is_none());
    }
}
