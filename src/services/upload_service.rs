use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use super::error::ServiceResult;
use super::user_service::UserService;
use crate::auth::CurrentUser;
use crate::storage::{object_key, ObjectStorage, Upload};

pub struct UploadService {
    users: Arc<UserService>,
    storage: Arc<dyn ObjectStorage>,
    default_avatar: String,
}

impl UploadService {
    pub fn new(users: Arc<UserService>, storage: Arc<dyn ObjectStorage>, default_avatar: impl Into<String>) -> Self {
        Self {
            users,
            storage,
            default_avatar: default_avatar.into(),
        }
    }

    /// Store a new avatar, point the profile at it and drop the previous file unless it is the shared default
    pub async fn change_avatar(&self, current: &CurrentUser, upload: Upload) -> ServiceResult<String> {
        let key = object_key("avatar", "avatar_", &upload);
        let url = self.storage.put(&key, &upload).await?;

        self.users.set_profile_field(current, "avatar", Value::from(url.clone())).await?;

        let previous = current.avatar();
        if !previous.is_empty() && previous != self.default_avatar {
            if let Some(old_key) = self.storage.key_for_url(&previous) {
                if let Err(e) = self.storage.delete(&old_key).await {
                    warn!("Could not delete previous avatar {}: {}", old_key, e);
                }
            }
        }

        Ok(url)
    }

    /// Store each file under `img/` and return their URLs in upload order
    pub async fn upload_images(&self, files: Vec<Upload>) -> ServiceResult<Vec<String>> {
        let mut urls = Vec::with_capacity(files.len());
        for upload in files {
            let key = object_key("img", "file_", &upload);
            urls.push(self.storage.put(&key, &upload).await?);
        }
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenSigner;
    use crate::cache::{MemoryCache, SessionCache};
    use crate::database::{IdGenerator, MemoryStore, Repository};
    use crate::filter::FilterOptions;
    use crate::services::user_service::Credentials;
    use crate::storage::LocalObjectStorage;
    use std::time::Duration;

    const DEFAULT_AVATAR: &str = "http://localhost/public/avatar/default_avatar.png";

    async fn fixture(dir: &tempfile::TempDir) -> (Arc<UserService>, UploadService) {
        let store = Arc::new(MemoryStore::new());
        let users = Repository::new(store, "users", "userId", IdGenerator::default(), FilterOptions::default());
        users.init().await.unwrap();
        let sessions = SessionCache::new(Arc::new(MemoryCache::new()), Duration::from_secs(60), Duration::from_secs(60));
        let signer = TokenSigner::new("secret", 1).unwrap();
        let user_service = Arc::new(UserService::new(users, sessions, signer, DEFAULT_AVATAR));

        let storage = Arc::new(LocalObjectStorage::new(dir.path(), "http://localhost/public"));
        let uploads = UploadService::new(user_service.clone(), storage, DEFAULT_AVATAR);
        (user_service, uploads)
    }

    #[tokio::test]
    async fn avatar_change_updates_session_and_removes_old_file() {
        let dir = tempfile::tempdir().unwrap();
        let (users, uploads) = fixture(&dir).await;
        let payload = users
            .register(Credentials {
                username: Some("apoc0001".into()),
                password: Some("secret1".into()),
                remember_me: false,
            })
            .await
            .unwrap();

        let current = users.authenticate(&payload.token).await.unwrap();
        assert_eq!(current.avatar(), DEFAULT_AVATAR);

        let first = uploads
            .change_avatar(&current, Upload::new(b"1".to_vec(), "image/png"))
            .await
            .unwrap();
        assert!(first.starts_with("http://localhost/public/avatar/avatar_"));

        let current = users.authenticate(&payload.token).await.unwrap();
        assert_eq!(current.avatar(), first);
        let first_path = dir.path().join(first.trim_start_matches("http://localhost/public/"));
        assert!(first_path.exists());

        uploads
            .change_avatar(&current, Upload::new(b"2".to_vec(), "image/png"))
            .await
            .unwrap();
        assert!(!first_path.exists());
    }

    #[tokio::test]
    async fn images_are_stored_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (_, uploads) = fixture(&dir).await;

        let urls = uploads
            .upload_images(vec![
                Upload::new(b"a".to_vec(), "image/png"),
                Upload::new(b"b".to_vec(), "image/jpeg"),
            ])
            .await
            .unwrap();

        assert_eq!(urls.len(), 2);
        assert!(urls[0].ends_with(".png"));
        assert!(urls[1].ends_with(".jpg"));
        assert!(uploads.upload_images(vec![]).await.unwrap().is_empty());
    }
}
