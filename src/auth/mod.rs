//! Single-operator authentication.
//!
//! - [`credentials`]: salted password hashes and the login check
//! - [`session`]: signed session cookies with an inactivity window
//! - [`gate`]: the middleware that allows or denies every protected route

pub mod credentials;
pub mod gate;
pub mod session;

use thiserror::Error;

pub use credentials::{hash_password, hash_password_with_salt, verify_password, Credentials};
pub use gate::{authorize, require_session, Access};
pub use session::{SessionStore, SESSION_COOKIE};

/// Authentication failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Stored hash is not `sha256$<salt>$<hex>`.
    #[error("invalid password hash: {0}")]
    InvalidHash(String),

    /// Session signing key is unusable.
    #[error("invalid session secret: {0}")]
    InvalidSecret(String),
}
