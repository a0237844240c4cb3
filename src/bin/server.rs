//! control-panel HTTP server binary.
//!
//! Loads every built-in module, then serves the dashboard and its JSON API
//! behind a single-operator login.
//!
//! # Environment Variables
//!
//! - `HOST`: bind address (default: 0.0.0.0)
//! - `PORT`: HTTP port (default: 8000)
//! - `SECRET_KEY`: session signing key
//! - `AUTH_USERNAME` / `AUTH_PASSWORD_HASH`: operator login (see `hash-password`)
//! - `SESSION_MAX_AGE`: session inactivity window in seconds (default: 3600)
//! - `CONTROL_PANEL_CONFIG`: module configuration file (default: config.toml)
//! - `RUST_LOG`: tracing filter (default: "info,control_panel=debug")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server
//! ```

use std::sync::Arc;

use anyhow::Context;
use control_panel::auth::{Credentials, SessionStore};
use control_panel::config::AppConfig;
use control_panel::modules::{DispatchGateway, ModuleLoader, ModuleRegistry};
use control_panel::server::{app_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,control_panel=debug".into()),
        )
        .init();

    let config = AppConfig::from_env().context("Invalid environment configuration")?;
    if config.is_insecure() {
        for name in &config.insecure_fallbacks {
            tracing::warn!(
                "{} is not set; using the insecure development default. Set it before exposing this server.",
                name
            );
        }
    }

    let loader = ModuleLoader::with_builtins().with_config_path(&config.panel_config_path);
    let registry = tokio::task::spawn_blocking(move || ModuleRegistry::load(loader))
        .await
        .context("Module loading panicked")?;
    for failure in registry.snapshot().failures() {
        tracing::warn!("Module {} not loaded: {}", failure.module_id, failure.error);
    }

    let sessions = SessionStore::new(&config.secret_key, config.session_max_age)
        .context("Invalid SECRET_KEY")?;
    let credentials = Credentials::new(&config.auth_username, &config.auth_password_hash);
    let state = AppState::new(
        DispatchGateway::new(Arc::new(registry)),
        sessions,
        credentials,
    );
    let app = app_router(state);

    let bind_addr = config.bind_addr();
    tracing::info!("control-panel v{} starting on {}", control_panel::VERSION, bind_addr);
    tracing::info!("Module config: {}", config.panel_config_path.display());
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                   - liveness probe");
    tracing::info!("  GET  /                         - dashboard");
    tracing::info!("  GET  /api/modules              - list modules");
    tracing::info!("  POST /api/modules/:id/action   - run an action");
    tracing::info!("  GET  /api/reload               - rediscover modules");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
