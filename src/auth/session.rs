//! Server-side sessions carried by a signed cookie.
//!
//! Cookie value: `<token>.<signature>`, where the signature is
//! HMAC-SHA256 of the token under `SECRET_KEY`, base64url without padding.
//! A session expires after `max_age` without an authorized request; every
//! successful validation pushes the expiry forward.

use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use super::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone)]
struct SessionRecord {
    username: String,
    last_seen: Instant,
}

/// In-memory session table.
pub struct SessionStore {
    mac: HmacSha256,
    max_age: Duration,
    sessions: DashMap<String, SessionRecord>,
}

impl SessionStore {
    pub fn new(secret: &str, max_age: Duration) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::InvalidSecret("secret must not be empty".to_string()));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| AuthError::InvalidSecret(e.to_string()))?;
        Ok(Self {
            mac,
            max_age,
            sessions: DashMap::new(),
        })
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Number of live (not yet pruned) sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Start a session and return the cookie value.
    pub fn create(&self, username: &str) -> String {
        self.prune();
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(
            token.clone(),
            SessionRecord {
                username: username.to_string(),
                last_seen: Instant::now(),
            },
        );
        format!("{}.{}", token, self.sign(&token))
    }

    /// Username for a cookie value, refreshing its inactivity window.
    ///
    /// Bad signatures, unknown tokens, and expired sessions yield `None`;
    /// expired sessions are removed.
    pub fn validate(&self, cookie_value: &str) -> Option<String> {
        let token = self.verified_token(cookie_value)?;
        let mut record = self.sessions.get_mut(token)?;
        if record.last_seen.elapsed() >= self.max_age {
            drop(record);
            self.sessions.remove(token);
            log::debug!("Session expired");
            return None;
        }
        record.last_seen = Instant::now();
        Some(record.username.clone())
    }

    /// End a session immediately. Unknown or forged values are ignored.
    pub fn destroy(&self, cookie_value: &str) {
        if let Some(token) = self.verified_token(cookie_value) {
            self.sessions.remove(token);
        }
    }

    /// Drop every session past its inactivity window.
    pub fn prune(&self) {
        let max_age = self.max_age;
        self.sessions.retain(|_, r| r.last_seen.elapsed() < max_age);
    }

    /// `Set-Cookie` value establishing a session.
    pub fn set_cookie(&self, cookie_value: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            cookie_value,
            self.max_age.as_secs()
        )
    }

    /// `Set-Cookie` value clearing the session cookie.
    pub fn clear_cookie(&self) -> String {
        format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
    }

    fn sign(&self, token: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    fn verified_token<'a>(&self, cookie_value: &'a str) -> Option<&'a str> {
        let (token, signature) = cookie_value.split_once('.')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(token)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("max_age", &self.max_age)
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

/// The session cookie value from a request's `Cookie` headers.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}
