//! DashboardModule trait: the contract every panel module implements.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::PanelConfig;

use super::error::ModuleError;
use super::module_def::{ActionDescriptor, ActionResult, ModuleIdentity, StatusMap};

/// Action parameters as sent by the frontend.
pub type Params = Map<String, Value>;

/// The core module trait.  Every widget on the panel implements this.
///
/// Modules own their mutable state (counters, running flags, session
/// tokens) and protect it themselves: the registry shares one instance
/// across all concurrent requests.
///
/// Only [`execute`](DashboardModule::execute) may mutate state.  `status`
/// and `actions` must be safe to call at any time, any number of times.
#[async_trait]
pub trait DashboardModule: Send + Sync {
    /// Display metadata.  Constant for the lifetime of the instance.
    fn identity(&self) -> ModuleIdentity;

    /// Current status snapshot.
    ///
    /// May read OS counters or other local state; must not change what a
    /// subsequent call observes.
    async fn status(&self) -> Result<StatusMap, ModuleError>;

    /// Ordered action catalog.  May depend on internal state.
    fn actions(&self) -> Vec<ActionDescriptor>;

    /// Run one action.
    ///
    /// Unknown action ids and invalid parameters are answered with a failed
    /// [`ActionResult`], never with a panic.  Any blocking external call
    /// made here must carry its own timeout.
    async fn execute(&self, action_id: &str, params: &Params) -> ActionResult;
}

/// Construction hook used by the module manifest.
///
/// Construction may read the module configuration file and may fail; a
/// failing module is skipped at load time without affecting the others.
pub trait FromConfig: DashboardModule + Sized + 'static {
    fn from_config(config: &PanelConfig) -> Result<Self, ModuleError>;
}

// ---------------------------------------------------------------------------
// Parameter helpers
// ---------------------------------------------------------------------------

/// Trimmed string parameter; missing or non-string values read as `""`.
///
/// Numbers are accepted and rendered, since HTML form values and JSON
/// numbers are used interchangeably for ids.
pub fn param_str(params: &Params, key: &str) -> String {
    match params.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Array parameter of strings; anything else reads as empty.
pub fn param_str_list(params: &Params, key: &str) -> Vec<String> {
    params
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
