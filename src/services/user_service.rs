use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::error::{ServiceError, ServiceResult};
use super::validate;
use crate::auth::{digest_password, CurrentUser, TokenSigner};
use crate::cache::SessionCache;
use crate::database::models::user::{PROTECTED_FIELDS, USERNAME_FIELD};
use crate::database::models::User;
use crate::database::{parse_identifier, DatabaseError, Repository};
use crate::filter::{Condition, Projection};
use crate::types::{Document, Identifier, INTERNAL_ID_FIELD};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub remember_me: bool,
}

/// Token plus the cached profile, returned by login and registration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub token: String,
    pub user_info: Document,
}

pub struct UserService {
    users: Repository,
    sessions: SessionCache,
    signer: TokenSigner,
    default_avatar: String,
}

fn public_profile() -> Projection {
    Projection::excluding(["password"])
}

fn identity_key_of(profile: &Document) -> ServiceResult<String> {
    profile
        .get("userId")
        .and_then(parse_identifier)
        .map(|id| id.to_string())
        .ok_or_else(|| ServiceError::NotFound("user record has no userId".to_string()))
}

fn username_taken() -> ServiceError {
    ServiceError::validation("Username already exists, try another one")
}

fn identifier_of(current: &CurrentUser) -> Option<Identifier> {
    current.identity_key.parse().ok()
}

impl UserService {
    pub fn new(users: Repository, sessions: SessionCache, signer: TokenSigner, default_avatar: impl Into<String>) -> Self {
        Self {
            users,
            sessions,
            signer,
            default_avatar: default_avatar.into(),
        }
    }

    pub fn sessions(&self) -> &SessionCache {
        &self.sessions
    }

    pub async fn register(&self, credentials: Credentials) -> ServiceResult<AuthPayload> {
        let username = validate::credential(credentials.username.as_deref(), "username")?;
        let password = validate::credential(credentials.password.as_deref(), "password")?;

        let taken = self
            .users
            .find_one(vec![Condition::equals(USERNAME_FIELD, Value::from(username))], Projection::default())
            .await?;
        if taken.is_some() {
            return Err(username_taken());
        }

        // the unique index settles registrations racing past the lookup
        let user = User::new(username, digest_password(username, password), &self.default_avatar);
        let id = match self.users.create(user.into_document()?).await {
            Ok(id) => id,
            Err(e) if e.is_conflict_on(USERNAME_FIELD) => return Err(username_taken()),
            Err(e) => return Err(e.into()),
        };

        let profile = self
            .users
            .find_one(vec![Condition::equals("userId", Value::from(id))], public_profile())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("user {} vanished after create", id)))?;

        let identity_key = id.to_string();
        let token = self.signer.mint(&identity_key)?;
        self.sessions.open(&identity_key, profile.clone()).await?;

        info!("Registered user {}", identity_key);
        Ok(AuthPayload { token, user_info: profile })
    }

    pub async fn login(&self, credentials: Credentials) -> ServiceResult<AuthPayload> {
        let username = credentials
            .username
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ServiceError::validation("username is required"))?;
        let password = credentials
            .password
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ServiceError::validation("password is required"))?;

        let conditions = vec![
            Condition::equals("username", Value::from(username)),
            Condition::equals("password", Value::from(digest_password(username, password))),
        ];
        let profile = self
            .users
            .find_one(conditions, public_profile())
            .await?
            .ok_or_else(|| ServiceError::validation("Invalid username or password"))?;

        let identity_key = identity_key_of(&profile)?;
        let token = self.signer.mint(&identity_key)?;
        self.sessions.open(&identity_key, profile.clone()).await?;

        if credentials.remember_me {
            self.sessions.remember(profile.clone()).await?;
        }

        Ok(AuthPayload { token, user_info: profile })
    }

    /// Resolve a bearer token to the cached caller. A cache miss means "not logged in".
    pub async fn authenticate(&self, token: &str) -> ServiceResult<CurrentUser> {
        let identity_key = self
            .signer
            .verify(token)
            .map_err(|e| ServiceError::Unauthorized(e.to_string()))?;

        let session = self
            .sessions
            .get(&identity_key)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Session expired, please log in again".to_string()))?;

        Ok(CurrentUser {
            identity_key,
            profile: session.payload,
        })
    }

    pub async fn logout(&self, current: &CurrentUser) -> ServiceResult<()> {
        self.sessions.delete(&current.identity_key).await?;
        Ok(())
    }

    /// Apply profile edits; protected fields are silently dropped. Returns the applied set.
    pub async fn update_current(&self, current: &CurrentUser, fields: Document) -> ServiceResult<Document> {
        if fields.is_empty() {
            return Ok(Document::new());
        }

        if let Some(Value::String(nickname)) = fields.get("nickname") {
            if validate::is_blank(nickname) {
                return Err(ServiceError::validation("Nickname cannot be blank"));
            }
            if nickname.chars().count() > validate::MAX_NICKNAME_LENGTH {
                return Err(ServiceError::validation(format!(
                    "Nickname cannot be longer than {} characters",
                    validate::MAX_NICKNAME_LENGTH
                )));
            }
        }
        if let Some(Value::Array(_)) = fields.get("tags") {
            validate::normalize_tags(fields.get("tags"))?;
        }

        let set: Document = fields
            .into_iter()
            .filter(|(key, _)| !PROTECTED_FIELDS.contains(&key.as_str()))
            .collect();

        let applied = self.users.update_by_id(identifier_of(current), set).await?;

        if let Err(e) = self.sessions.refresh(&current.identity_key, &applied).await {
            warn!("Profile of {} saved but session refresh failed: {}", current.identity_key, e);
        }

        Ok(applied)
    }

    pub async fn update_current_password(&self, current: &CurrentUser, password: Option<String>) -> ServiceResult<()> {
        let password = validate::credential(password.as_deref(), "password")?;
        let username = match current.profile.get("username") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(ServiceError::Unauthorized("Session has no username".to_string())),
        };

        let mut set = Document::new();
        set.insert("password".to_string(), Value::from(digest_password(&username, password)));
        self.users.update_by_id(identifier_of(current), set).await?;
        Ok(())
    }

    /// Empty query returns the caller's cached profile; otherwise the first matching user or `{}`
    pub async fn user_info(&self, current: &CurrentUser, equals: Document) -> ServiceResult<Document> {
        if equals.is_empty() {
            return Ok(current.profile.clone());
        }

        let conditions = equals
            .into_iter()
            .filter(|(key, _)| key != INTERNAL_ID_FIELD && key != "password")
            .map(|(key, value)| Condition::equals(key, value))
            .collect();

        Ok(self.users.find_one(conditions, public_profile()).await?.unwrap_or_default())
    }

    /// Overwrite one profile field in the store and in the caller's session
    pub(crate) async fn set_profile_field(&self, current: &CurrentUser, field: &str, value: Value) -> ServiceResult<()> {
        let mut set = Document::new();
        set.insert(field.to_string(), value);
        let applied = self.users.update_by_id(identifier_of(current), set).await?;

        if let Err(e) = self.sessions.refresh(&current.identity_key, &applied).await {
            warn!("{} of {} saved but session refresh failed: {}", field, current.identity_key, e);
        }
        Ok(())
    }
}
