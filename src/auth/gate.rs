//! Session gate for protected routes.
//!
//! Denied API requests (`/api/...`) get `401` with a JSON error body so the
//! frontend can react; denied page requests are redirected to `/login`.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde_json::json;

use super::session::{session_cookie, SessionStore};

/// Outcome of a session check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Authenticated as this username.
    Allow(String),
    Deny,
}

/// Check the request's session cookie.
pub fn authorize(sessions: &SessionStore, headers: &HeaderMap) -> Access {
    match session_cookie(headers).and_then(|value| sessions.validate(&value)) {
        Some(username) => Access::Allow(username),
        None => Access::Deny,
    }
}

/// Middleware applied to every protected route.
///
/// Authorized responses re-issue the session cookie so the browser's
/// `Max-Age` slides along with the server-side inactivity window.
pub async fn require_session(
    State(sessions): State<Arc<SessionStore>>,
    request: Request,
    next: Next,
) -> Response {
    let cookie_value = match authorize(&sessions, request.headers()) {
        Access::Allow(_) => session_cookie(request.headers()),
        Access::Deny => return deny(request.uri().path()),
    };

    let mut response = next.run(request).await;
    if let Some(value) = cookie_value {
        if !response.headers().contains_key(header::SET_COOKIE) {
            match HeaderValue::from_str(&sessions.set_cookie(&value)) {
                Ok(refreshed) => {
                    response.headers_mut().insert(header::SET_COOKIE, refreshed);
                }
                Err(e) => log::warn!("Could not refresh session cookie: {}", e),
            }
        }
    }
    response
}

fn deny(path: &str) -> Response {
    if path == "/api" || path.starts_with("/api/") {
        log::debug!("Rejected unauthenticated API request: {}", path);
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"success": false, "error": "Authentication required"})),
        )
            .into_response()
    } else {
        Redirect::to("/login").into_response()
    }
}
