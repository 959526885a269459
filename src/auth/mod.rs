pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::MAX_JWT_EXPIRY_HOURS;
use crate::types::Document;

pub use password::digest_password;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Identity key of the caller, the session cache key
    pub user_id: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: impl Into<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let hours = expiry_hours.min(MAX_JWT_EXPIRY_HOURS) as i64;
        let exp = (now + Duration::hours(hours)).timestamp();

        Self {
            user_id: user_id.into(),
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

/// Mints and verifies HS256 tokens carrying the caller's identity key
#[derive(Clone)]
pub struct TokenSigner {
    secret: String,
    expiry_hours: u64,
}

impl TokenSigner {
    pub fn new(secret: impl Into<String>, expiry_hours: u64) -> Result<Self, AuthError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }
        Ok(Self { secret, expiry_hours })
    }

    pub fn mint(&self, identity_key: &str) -> Result<String, AuthError> {
        let claims = Claims::new(identity_key, self.expiry_hours);
        let encoding_key = EncodingKey::from_secret(self.secret.as_bytes());

        encode(&Header::default(), &claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    /// Returns the identity key carried by a valid, unexpired token
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(token_data.claims.user_id)
    }
}

/// The caller of an authenticated request, as resolved from the session cache
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub identity_key: String,
    pub profile: Document,
}

impl CurrentUser {
    fn text(&self, field: &str) -> String {
        match self.profile.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    pub fn nickname(&self) -> String {
        self.text("nickname")
    }

    pub fn avatar(&self) -> String {
        self.text("avatar")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mint_then_verify_returns_identity_key() {
        let signer = TokenSigner::new("secret", 1).unwrap();
        let token = signer.mint("123456").unwrap();
        assert_eq!(signer.verify(&token).unwrap(), "123456");
    }

    #[test]
    fn rejects_foreign_and_garbled_tokens() {
        let ours = TokenSigner::new("secret", 1).unwrap();
        let theirs = TokenSigner::new("other", 1).unwrap();
        let token = theirs.mint("1").unwrap();

        assert!(matches!(ours.verify(&token), Err(AuthError::InvalidToken(_))));
        assert!(ours.verify("not.a.token").is_err());
    }

    #[test]
    fn huge_expiry_is_capped() {
        let claims = Claims::new("1", u64::MAX);
        let cap = (MAX_JWT_EXPIRY_HOURS * 3600) as i64;
        assert!(claims.exp - claims.iat <= cap);
        assert!(claims.exp > claims.iat);

        let signer = TokenSigner::new("secret", u64::MAX).unwrap();
        let token = signer.mint("42").unwrap();
        assert_eq!(signer.verify(&token).unwrap(), "42");
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(TokenSigner::new("", 1), Err(AuthError::InvalidSecret)));
    }

    #[test]
    fn current_user_reads_profile_text() {
        let user = CurrentUser {
            identity_key: "1".into(),
            profile: json!({ "nickname": "neo", "avatar": null }).as_object().cloned().unwrap(),
        };
        assert_eq!(user.nickname(), "neo");
        assert_eq!(user.avatar(), "");
    }
}
