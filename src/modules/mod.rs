//! Module system: pluggable panel widgets behind one generic contract.
//!
//! A **module** exposes display metadata, a status snapshot, and a catalog
//! of actions.  The frontend renders every module from the same
//! [`ModuleDescriptor`] shape and never knows what a module does inside.
//!
//! # Architecture
//!
//! ```text
//! manifest (ModuleFactory per type) + config.toml
//!   ↓  ModuleLoader::load_all()
//! RegistrySnapshot (id → Arc<dyn DashboardModule>)
//!   ↓  ModuleRegistry (ArcSwap, atomic reload)
//! DispatchGateway: list / status / action / reload
//!   ↓
//! HTTP routes (session-gated)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use control_panel::modules::{DispatchGateway, ModuleLoader, ModuleRegistry};
//!
//! # async fn run() {
//! let registry = ModuleRegistry::load(ModuleLoader::with_builtins());
//! let gateway = DispatchGateway::new(Arc::new(registry));
//! let modules = gateway.list_modules().await;
//! # }
//! ```

pub mod error;
pub mod gateway;
pub mod loader;
pub mod module_base;
pub mod module_def;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use error::{GatewayError, ModuleError};
pub use gateway::{DispatchGateway, ReloadSummary};
pub use loader::{derive_module_id, LoadFailure, LoadedModules, ModuleFactory, ModuleLoader};
pub use module_base::{param_str, param_str_list, DashboardModule, FromConfig, Params};
pub use module_def::{
    ActionDescriptor, ActionKind, ActionRequest, ActionResult, ActionVariant, ModuleDescriptor,
    ModuleIdentity, StatusMap, DEFAULT_COLOR, DEFAULT_ICON,
};
pub use registry::{ModuleRegistry, RegistrySnapshot};
