use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use super::error::{ServiceError, ServiceResult};
use super::validate;
use crate::auth::CurrentUser;
use crate::database::models::{Blog, Editor};
use crate::database::{parse_identifier, DatabaseError, Repository};
use crate::filter::{FilterSpec, SortDirection};
use crate::storage::{object_key, ObjectStorage, Upload};
use crate::types::{Document, Identifier, Page};

const COVER_FOLDER: &str = "cover";
const COVER_PREFIX: &str = "cover_";

pub struct BlogService {
    blogs: Repository,
    storage: Arc<dyn ObjectStorage>,
}

fn check_title(fields: &Document) -> ServiceResult<()> {
    match fields.get("title") {
        Some(Value::String(title)) if !title.is_empty() => {
            if validate::is_blank(title) {
                return Err(ServiceError::validation("Title cannot be blank"));
            }
            Ok(())
        }
        _ => Err(ServiceError::validation("Title is required")),
    }
}

fn check_editor(fields: &Document) -> ServiceResult<()> {
    match fields.get("editor") {
        None => Ok(()),
        Some(value) => serde_json::from_value::<Editor>(value.clone())
            .map(|_| ())
            .map_err(|_| ServiceError::validation("editor must be RICH_TEXT or MARKDOWN")),
    }
}

/// Title, editor and tag checks shared by add and update; tags are rewritten as an array
fn prepare(fields: &mut Document) -> ServiceResult<()> {
    check_title(fields)?;
    check_editor(fields)?;
    let tags = validate::normalize_tags(fields.get("tags"))?;
    fields.insert("tags".to_string(), Value::from(tags));
    Ok(())
}

impl BlogService {
    pub fn new(blogs: Repository, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { blogs, storage }
    }

    /// Newest first by default. Posts written by the caller carry the caller's current avatar and nickname.
    pub async fn query_blog_page(&self, current: Option<&CurrentUser>, caller: &FilterSpec) -> ServiceResult<Page<Document>> {
        let defaults = FilterSpec::new().sort_by("createdAt", SortDirection::Desc);

        let author = current.map(|user| (user.identity_key.clone(), user.avatar(), user.nickname()));
        let page = self
            .blogs
            .query_with(caller, &defaults, move |items| match author {
                None => items,
                Some((identity_key, avatar, nickname)) => items
                    .into_iter()
                    .map(|mut item| {
                        if item.get("createdId").and_then(Value::as_str) == Some(identity_key.as_str()) {
                            item.insert("createdAvatar".to_string(), Value::from(avatar.clone()));
                            item.insert("createdName".to_string(), Value::from(nickname.clone()));
                        }
                        item
                    })
                    .collect(),
            })
            .await?;

        Ok(page)
    }

    /// Listing restricted to one author unless the caller overrides `createdId`
    pub async fn somebody_blog_list(&self, user_id: Option<&str>, caller: &FilterSpec) -> ServiceResult<Page<Document>> {
        let user_id = user_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ServiceError::validation("User not found"))?;

        let defaults = FilterSpec::new().equal("createdId", Value::from(user_id));
        Ok(self.blogs.query(caller, &defaults).await?)
    }

    pub async fn add_blog(&self, current: &CurrentUser, mut fields: Document, cover: Option<Upload>) -> ServiceResult<Identifier> {
        prepare(&mut fields)?;

        fields.insert("createdAvatar".to_string(), Value::from(current.avatar()));
        fields.insert("createdName".to_string(), Value::from(current.nickname()));
        fields.insert("createdId".to_string(), Value::from(current.identity_key.clone()));

        if let Some(upload) = cover {
            let url = self.storage.put(&object_key(COVER_FOLDER, COVER_PREFIX, &upload), &upload).await?;
            fields.insert("cover".to_string(), Value::from(url));
        }

        fields.remove("id");
        let doc = Blog::normalize(fields)?;
        Ok(self.blogs.create(doc).await?)
    }

    /// `$set` the given fields. A new cover replaces the stored one and the old object is removed best-effort.
    pub async fn update_blog(&self, mut fields: Document, cover: Option<Upload>) -> ServiceResult<Document> {
        let id = fields
            .get("id")
            .and_then(parse_identifier)
            .ok_or_else(|| ServiceError::validation("id is required"))?;
        prepare(&mut fields)?;

        if let Some(upload) = cover {
            let previous = self.blog_by_id(id).await?;
            let url = self.storage.put(&object_key(COVER_FOLDER, COVER_PREFIX, &upload), &upload).await?;
            fields.insert("cover".to_string(), Value::from(url));

            if let Some(old) = previous.get("cover").and_then(Value::as_str) {
                self.discard(old).await;
            }
        }

        Ok(self.blogs.update_by_id(Some(id), fields).await?)
    }

    pub async fn delete_blog(&self, id: Option<Identifier>) -> ServiceResult<()> {
        Ok(self.blogs.delete_by_id(id).await?)
    }

    /// Fetch one post and count the read
    pub async fn blog_info(&self, id: Option<Identifier>) -> ServiceResult<Document> {
        let id = id.ok_or_else(|| ServiceError::validation("id is required"))?;
        let mut blog = self.blog_by_id(id).await?;

        let reads = blog.get("reads").and_then(Value::as_i64).unwrap_or(0);
        let reads = self.blogs.increment_by_id(id, "reads", reads).await?;
        blog.insert("reads".to_string(), Value::from(reads));
        Ok(blog)
    }

    async fn blog_by_id(&self, id: Identifier) -> ServiceResult<Document> {
        match self.blogs.get_by_id(Some(id)).await {
            Ok(blog) => Ok(blog),
            Err(DatabaseError::NotFound(_)) => Err(ServiceError::NotFound("Blog post does not exist".to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn discard(&self, url: &str) {
        let Some(key) = self.storage.key_for_url(url) else {
            return;
        };
        if let Err(e) = self.storage.delete(&key).await {
            warn!("Could not delete replaced cover {}: {}", key, e);
        }
    }
}
