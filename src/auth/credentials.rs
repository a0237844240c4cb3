//! Password hashing and the operator credential check.
//!
//! Hashes are stored as `sha256$<salt>$<hex digest of salt || password>`.
//! Generate one with the `hash-password` binary.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::AuthError;

const SCHEME: &str = "sha256";

/// Hash `password` with an explicit salt.
pub fn hash_password_with_salt(password: &str, salt: &str) -> String {
    format!("{}${}${}", SCHEME, salt, digest_hex(salt, password))
}

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    hash_password_with_salt(password, &Uuid::new_v4().simple().to_string())
}

/// Check `password` against a stored hash.
///
/// Returns `Err` only when the stored hash itself is malformed.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let mut parts = stored.splitn(3, '$');
    let (scheme, salt, expected) = match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(salt), Some(expected)) => (scheme, salt, expected),
        _ => return Err(AuthError::InvalidHash("expected sha256$<salt>$<hex>".to_string())),
    };
    if scheme != SCHEME {
        return Err(AuthError::InvalidHash(format!("unsupported scheme '{}'", scheme)));
    }
    let expected = hex::decode(expected.trim())
        .map_err(|e| AuthError::InvalidHash(format!("digest is not hex: {}", e)))?;

    let actual = digest(salt, password);
    Ok(constant_time_eq(&actual, &expected))
}

fn digest(salt: &str, password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

fn digest_hex(salt: &str, password: &str) -> String {
    hex::encode(digest(salt, password))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// The single operator account.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password_hash: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Username equality plus password verification.
    pub fn check(&self, username: &str, password: &str) -> bool {
        if username != self.username {
            return false;
        }
        match verify_password(password, &self.password_hash) {
            Ok(valid) => valid,
            Err(e) => {
                log::error!("Configured password hash is unusable: {}", e);
                false
            }
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_format_and_verify() {
        let hash = hash_password_with_salt("hunter2", "pepper");
        assert!(hash.starts_with("sha256$pepper$"));
        assert_eq!(hash.rsplit('$').next().unwrap().len(), 64);
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn test_random_salts_differ() {
        let a = hash_password("same");
        let b = hash_password("same");
        assert_ne!(a, b);
        assert!(verify_password("same", &a).unwrap());
        assert!(verify_password("same", &b).unwrap());
    }

    #[test]
    fn test_malformed_hashes() {
        assert!(matches!(verify_password("x", "plain"), Err(AuthError::InvalidHash(_))));
        assert!(matches!(verify_password("x", "md5$s$abcd"), Err(AuthError::InvalidHash(_))));
        assert!(matches!(verify_password("x", "sha256$s$zz"), Err(AuthError::InvalidHash(_))));
    }

    #[test]
    fn test_credentials_check() {
        let creds = Credentials::new("admin", hash_password("secret"));
        assert!(creds.check("admin", "secret"));
        assert!(!creds.check("Admin", "secret"));
        assert!(!creds.check("admin", "wrong"));

        let broken = Credentials::new("admin", "not-a-hash");
        assert!(!broken.check("admin", "secret"));
        assert!(!format!("{:?}", creds).contains("sha256"));
    }
}
