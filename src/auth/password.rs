use sha2::{Digest, Sha256};

/// Hex SHA-256 of `username:password`; stored in place of the password and compared on login
pub fn digest_password(username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}
