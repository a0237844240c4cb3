//! HTTP server for the control panel.
//!
//! Serves the generic dashboard and the session-gated JSON API over the
//! [`DispatchGateway`](crate::modules::DispatchGateway).
//!
//! # Endpoints
//!
//! - `GET  /health`: liveness probe
//! - `GET|POST /login`, `GET /logout`: session management
//! - `GET  /`: dashboard
//! - `/api/...`: module list, status, actions, reload

pub mod pages;
pub mod routes;

pub use routes::{app_router, AppState};
