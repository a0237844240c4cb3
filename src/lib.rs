//! # control-panel
//!
//! A self-hosted server control panel. Independent **modules** (system
//! information, service control, shell shortcuts, expense splitting) plug
//! into one contract; a registry loads them at startup, a dispatch gateway
//! exposes a uniform status/action protocol over HTTP, and a single generic
//! web page renders every module without knowing what it does.
//!
//! - [`modules`]: module contract, loader, registry, dispatch gateway
//! - [`builtin`]: the modules shipped with the panel
//! - [`integrations`]: Splitwise and OpenRouter clients
//! - [`auth`]: password check, sessions, the session gate
//! - [`server`]: axum router and embedded pages
//! - [`config`]: environment and `config.toml`

pub mod auth;
pub mod builtin;
pub mod config;
pub mod integrations;
pub mod modules;
pub mod server;

pub use config::{AppConfig, PanelConfig};
pub use modules::{DashboardModule, DispatchGateway, ModuleLoader, ModuleRegistry};

/// Crate version, reported by `/health` and the system information module.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
