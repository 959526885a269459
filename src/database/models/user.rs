use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::DatabaseError;
use crate::types::{Document, Identifier};

pub const COLLECTION: &str = "users";
pub const ID_FIELD: &str = "userId";
pub const USERNAME_FIELD: &str = "username";

/// Fields a user may never change through the profile update
pub const PROTECTED_FIELDS: &[&str] = &[
    "_id",
    "access",
    "username",
    "password",
    "userId",
    "createdAt",
    "updatedAt",
    "notifyCount",
    "unreadCount",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Identifier>,
    pub username: String,
    pub password: String,
    pub nickname: String,
    pub avatar: String,
    pub access: String,
    pub tags: Vec<String>,
    pub notify_count: u64,
    pub unread_count: u64,
}

impl User {
    pub fn new(username: &str, password_digest: String, avatar: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password_digest,
            nickname: username.to_string(),
            avatar: avatar.to_string(),
            access: "user".to_string(),
            ..Default::default()
        }
    }

    pub fn into_document(self) -> Result<Document, DatabaseError> {
        match serde_json::to_value(self)? {
            Value::Object(doc) => Ok(doc),
            _ => Err(DatabaseError::validation("Invalid user")),
        }
    }
}
