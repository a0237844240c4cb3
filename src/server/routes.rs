//! Axum route handlers for the control panel.
//!
//! # Routes
//!
//! Public:
//! - `GET  /health`: `{"status": "ok", "version": ..., "service": "control-panel"}`
//! - `GET  /login`, `POST /login`, `GET /logout`
//!
//! Session required:
//! - `GET  /`: dashboard page
//! - `GET  /api/modules`: every module with status and actions
//! - `GET  /api/modules/:id/status`: one module's status
//! - `POST /api/modules/:id/action`: `{"action_id": ..., "params": {...}}`
//! - `GET  /api/reload`: rediscover modules

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    middleware::from_fn_with_state,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::pages;
use crate::auth::session::session_cookie;
use crate::auth::{authorize, require_session, Access, Credentials, SessionStore};
use crate::modules::{ActionRequest, DispatchGateway, GatewayError};

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub gateway: DispatchGateway,
    pub sessions: Arc<SessionStore>,
    pub credentials: Arc<Credentials>,
}

impl AppState {
    pub fn new(gateway: DispatchGateway, sessions: SessionStore, credentials: Credentials) -> Self {
        Self {
            gateway,
            sessions: Arc::new(sessions),
            credentials: Arc::new(credentials),
        }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/", get(index_handler))
        .route("/api/modules", get(list_modules_handler))
        .route("/api/modules/:id/status", get(module_status_handler))
        .route("/api/modules/:id/action", post(module_action_handler))
        .route("/api/reload", get(reload_handler))
        .route_layer(from_fn_with_state(
            Arc::clone(&state.sessions),
            require_session,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/login", get(login_page_handler).post(login_handler))
        .route("/logout", get(logout_handler))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Execution(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        log::debug!("Gateway request failed ({}): {}", self.kind(), self);
        (
            status,
            Json(json!({"success": false, "error": self.to_string()})),
        )
            .into_response()
    }
}

// ============================================================================
// Public routes
// ============================================================================

/// GET /health: liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "control-panel",
    }))
}

#[derive(Debug, Deserialize)]
struct LoginQuery {
    error: Option<String>,
}

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// GET /login: login page, or straight to the dashboard when signed in.
async fn login_page_handler(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Response {
    if let Access::Allow(_) = authorize(&state.sessions, &headers) {
        return Redirect::to("/").into_response();
    }
    Html(pages::login_page(query.error.is_some())).into_response()
}

/// POST /login: check the form and start a session.
async fn login_handler(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    if !state.credentials.check(&form.username, &form.password) {
        log::warn!("Failed login attempt for user '{}'", form.username);
        return Redirect::to("/login?error=invalid").into_response();
    }

    log::info!("User '{}' logged in", state.credentials.username());
    let cookie = state.sessions.create(state.credentials.username());
    (
        [(header::SET_COOKIE, state.sessions.set_cookie(&cookie))],
        Redirect::to("/"),
    )
        .into_response()
}

/// GET /logout: end the session.
async fn logout_handler(State(state): State<AppState>, headers: axum::http::HeaderMap) -> Response {
    if let Some(cookie) = session_cookie(&headers) {
        state.sessions.destroy(&cookie);
    }
    (
        [(header::SET_COOKIE, state.sessions.clear_cookie())],
        Redirect::to("/login"),
    )
        .into_response()
}

// ============================================================================
// Protected routes
// ============================================================================

/// GET /: the dashboard.
async fn index_handler() -> Html<&'static str> {
    Html(pages::INDEX_HTML)
}

/// GET /api/modules
async fn list_modules_handler(State(state): State<AppState>) -> Json<Value> {
    let modules = state.gateway.list_modules().await;
    Json(json!({"success": true, "modules": modules}))
}

/// GET /api/modules/:id/status
async fn module_status_handler(
    State(state): State<AppState>,
    Path(module_id): Path<String>,
) -> Result<Json<Value>, GatewayError> {
    let status = state.gateway.get_status(&module_id).await?;
    Ok(Json(json!({"success": true, "status": status})))
}

/// POST /api/modules/:id/action
///
/// The body is parsed by hand so that malformed JSON gets the same
/// `{success, error}` envelope as every other failure.
async fn module_action_handler(
    State(state): State<AppState>,
    Path(module_id): Path<String>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let request: ActionRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ActionRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| GatewayError::BadRequest(format!("Invalid request body: {}", e)))?
    };

    let result = state.gateway.execute_action(&module_id, request).await?;
    Ok(Json(result).into_response())
}

/// GET /api/reload
async fn reload_handler(State(state): State<AppState>) -> Result<Json<Value>, GatewayError> {
    let gateway = state.gateway.clone();
    let summary = tokio::task::spawn_blocking(move || gateway.reload())
        .await
        .map_err(|e| GatewayError::Execution(format!("Reload failed: {}", e)))?;

    for failure in &summary.failures {
        log::warn!("Module {} failed to load: {}", failure.module_id, failure.error);
    }
    Ok(Json(json!({
        "success": true,
        "message": format!("Reloaded {} modules", summary.count),
        "modules": summary.ids,
    })))
}
