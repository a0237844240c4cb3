//! Module descriptor types: the uniform wire shape consumed by the frontend.
//!
//! Every module, whatever it does internally, is rendered from the same
//! [`ModuleDescriptor`]: identity, an opaque status map, and an ordered list
//! of [`ActionDescriptor`]s.  Action invocations always answer with an
//! [`ActionResult`].
//!
//! # Example JSON
//!
//! ```json
//! {
//!   "id": "servicecontrolmodule",
//!   "name": "Service Control",
//!   "description": "Start, stop, and restart the demo service",
//!   "icon": "⚡",
//!   "color": "#10b981",
//!   "status": {"status": "Stopped", "restart_count": 0},
//!   "actions": [{"id": "start", "label": "▶️ Start Service", "variant": "success"}]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Icon used when a module does not override it.
pub const DEFAULT_ICON: &str = "⚙️";

/// Color used when a module does not override it.
pub const DEFAULT_COLOR: &str = "#6366f1";

/// Module-defined status payload.  Opaque to the registry and gateway.
pub type StatusMap = Map<String, Value>;

// ============================================================================
// Identity
// ============================================================================

/// Display metadata of a module.  Constant for the lifetime of an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleIdentity {
    pub name: String,
    pub description: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl ModuleIdentity {
    /// Create an identity with the default icon and color.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            icon: default_icon(),
            color: default_color(),
        }
    }

    /// Override the icon (builder-style).
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// Override the color theme (builder-style).
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Presentation intent of an action button.  Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionVariant {
    #[default]
    Primary,
    Secondary,
    Danger,
    Success,
    Warning,
}

/// UI control hint for an action.  Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Button,
    Input,
    Toggle,
    Select,
    File,
}

/// One entry of a module's action catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Unique within the owning module.
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub variant: ActionVariant,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ActionKind>,
}

impl ActionDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>, variant: ActionVariant) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            variant,
            kind: None,
        }
    }

    /// Attach a UI control hint (builder-style).
    pub fn with_kind(mut self, kind: ActionKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Outcome of [`DashboardModule::execute`](super::module_base::DashboardModule::execute).
///
/// `message` is set on success and `error` on failure; the constructors keep
/// the two mutually exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ActionResult {
    /// Successful result with a human-readable message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            data: None,
        }
    }

    /// Failed result with a human-readable error.
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            data: None,
        }
    }

    /// Standard failure for an action id the module does not support.
    pub fn unknown_action(action_id: &str) -> Self {
        Self::fail(format!("Unknown action: {}", action_id))
    }

    /// Attach an action-specific payload (builder-style).
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

// ============================================================================
// Descriptor
// ============================================================================

/// The complete, generic view of one loaded module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    pub status: StatusMap,
    pub actions: Vec<ActionDescriptor>,
    /// Set when this module's probe failed during a list-all call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModuleDescriptor {
    pub fn new(
        id: impl Into<String>,
        identity: ModuleIdentity,
        status: StatusMap,
        actions: Vec<ActionDescriptor>,
    ) -> Self {
        Self {
            id: id.into(),
            name: identity.name,
            description: identity.description,
            icon: identity.icon,
            color: identity.color,
            status,
            actions,
            error: None,
        }
    }

    /// Descriptor for a module whose probe failed: identity only, plus the error.
    pub fn failed(id: impl Into<String>, identity: ModuleIdentity, error: impl Into<String>) -> Self {
        let mut descriptor = Self::new(id, identity, StatusMap::new(), Vec::new());
        descriptor.error = Some(error.into());
        descriptor
    }
}

// ============================================================================
// Invocation envelope
// ============================================================================

/// Body of `POST /api/modules/{id}/action`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub action_id: Option<String>,
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
}

impl ActionRequest {
    pub fn new(action_id: impl Into<String>) -> Self {
        Self {
            action_id: Some(action_id.into()),
            params: None,
        }
    }

    /// Attach parameters (builder-style).
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }
}
