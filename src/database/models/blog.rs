use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::DatabaseError;
use crate::types::{Document, Identifier};

pub const COLLECTION: &str = "blogs";
pub const ID_FIELD: &str = "id";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Editor {
    #[default]
    RichText,
    Markdown,
}

/// Stored shape of a blog post; absent fields take their defaults on create
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Blog {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Identifier>,
    pub created_name: String,
    pub created_id: String,
    pub created_avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    pub editor: Editor,
    pub title: String,
    pub content: String,
    pub md_data: String,
    pub preview_img: String,
    pub cover: String,
    pub tags: Vec<String>,
    pub reads: u64,
    pub likes: u64,
    pub collections: u64,
}

impl Blog {
    /// Fill defaults and check field types of a new post
    pub fn normalize(fields: Document) -> Result<Document, DatabaseError> {
        let blog: Blog = serde_json::from_value(Value::Object(fields))
            .map_err(|e| DatabaseError::validation(format!("Invalid blog: {}", e)))?;
        match serde_json::to_value(blog)? {
            Value::Object(doc) => Ok(doc),
            _ => Err(DatabaseError::validation("Invalid blog")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fills_defaults() {
        let doc = Blog::normalize(json!({ "title": "hello" }).as_object().cloned().unwrap()).unwrap();
        assert_eq!(doc["editor"], json!("RICH_TEXT"));
        assert_eq!(doc["tags"], json!([]));
        assert_eq!(doc["reads"], json!(0));
        assert!(!doc.contains_key("id"));
    }

    #[test]
    fn rejects_unknown_editor_and_negative_counters() {
        let bad_editor = json!({ "title": "t", "editor": "WYSIWYG" }).as_object().cloned().unwrap();
        assert!(Blog::normalize(bad_editor).is_err());

        let negative = json!({ "title": "t", "likes": -1 }).as_object().cloned().unwrap();
        assert!(Blog::normalize(negative).is_err());
    }
}
