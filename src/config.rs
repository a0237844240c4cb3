//! Configuration: process environment plus the module configuration file.
//!
//! Two layers:
//!
//! - [`AppConfig`] is read once from the environment at startup: bind
//!   address, session secret, login credentials, session lifetime, and the
//!   path of the module configuration file.
//! - [`PanelConfig`] is the TOML module configuration file.  It is re-read on
//!   every registry reload, so editing it and hitting `/api/reload` applies
//!   the change without a restart.
//!
//! # Example `config.toml`
//!
//! ```toml
//! [modules]
//! disabled = ["splitwisephonebillmodule"]
//!
//! [splitwise]
//! api_key = "..."
//!
//! [openrouter]
//! api_key = "..."
//! model = "google/gemini-2.0-flash-001:free"
//!
//! [quick_commands]
//! timeout_secs = 10
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::auth::credentials;
use crate::modules::ActionVariant;

/// Insecure session secret used when `SECRET_KEY` is unset.
pub const DEV_SECRET_KEY: &str = "dev-secret-key-change-in-production";

/// Login username used when `AUTH_USERNAME` is unset.
pub const DEV_USERNAME: &str = "admin";

/// Login password whose hash is used when `AUTH_PASSWORD_HASH` is unset.
pub const DEV_PASSWORD: &str = "admin";

/// Fixed salt for the development password hash.
const DEV_PASSWORD_SALT: &str = "control-panel-dev";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 3600;
pub const DEFAULT_PANEL_CONFIG: &str = "config.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

// ============================================================================
// AppConfig: environment
// ============================================================================

/// Process-level configuration read from the environment.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub secret_key: String,
    pub auth_username: String,
    pub auth_password_hash: String,
    /// Inactivity window after which a session expires.
    pub session_max_age: Duration,
    /// Path of the TOML module configuration file.
    pub panel_config_path: PathBuf,
    /// Environment variables that were missing and fell back to insecure
    /// development defaults.
    pub insecure_fallbacks: Vec<&'static str>,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut insecure_fallbacks = Vec::new();

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: raw.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        let session_max_age = match get("SESSION_MAX_AGE") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "SESSION_MAX_AGE",
                    value: raw.clone(),
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_SESSION_MAX_AGE_SECS),
        };

        let secret_key = get("SECRET_KEY").unwrap_or_else(|| {
            insecure_fallbacks.push("SECRET_KEY");
            DEV_SECRET_KEY.to_string()
        });
        let auth_username = get("AUTH_USERNAME").unwrap_or_else(|| {
            insecure_fallbacks.push("AUTH_USERNAME");
            DEV_USERNAME.to_string()
        });
        let auth_password_hash = get("AUTH_PASSWORD_HASH").unwrap_or_else(|| {
            insecure_fallbacks.push("AUTH_PASSWORD_HASH");
            credentials::hash_password_with_salt(DEV_PASSWORD, DEV_PASSWORD_SALT)
        });

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            secret_key,
            auth_username,
            auth_password_hash,
            session_max_age,
            panel_config_path: get("CONTROL_PANEL_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PANEL_CONFIG)),
            insecure_fallbacks,
        })
    }

    /// `host:port` string for binding the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether any security-relevant setting fell back to a development default.
    pub fn is_insecure(&self) -> bool {
        !self.insecure_fallbacks.is_empty()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secret_key", &"<redacted>")
            .field("auth_username", &self.auth_username)
            .field("auth_password_hash", &"<redacted>")
            .field("session_max_age", &self.session_max_age)
            .field("panel_config_path", &self.panel_config_path)
            .field("insecure_fallbacks", &self.insecure_fallbacks)
            .finish()
    }
}

// ============================================================================
// PanelConfig: module configuration file
// ============================================================================

/// Contents of the TOML module configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub modules: ModuleSelection,
    #[serde(default)]
    pub splitwise: Option<SplitwiseSettings>,
    #[serde(default)]
    pub openrouter: Option<OpenRouterSettings>,
    #[serde(default)]
    pub phone_bill: Option<PhoneBillSettings>,
    #[serde(default)]
    pub quick_commands: QuickCommandsSettings,
}

impl PanelConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load the configuration file.  A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::warn!(
                "Module configuration {} not found; using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`PanelConfig::load`], but logs errors and falls back to defaults.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            log::error!("{}; using default module configuration", e);
            Self::default()
        })
    }
}

/// `[modules]`: which compiled-in modules are loaded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleSelection {
    /// Allow-list of module ids.  `None` means every module.
    #[serde(default)]
    pub enabled: Option<Vec<String>>,
    /// Deny-list of module ids, applied after `enabled`.
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl ModuleSelection {
    /// Whether the module with this id should be loaded.
    pub fn allows(&self, module_id: &str) -> bool {
        let enabled = match &self.enabled {
            Some(list) => list.iter().any(|id| id.eq_ignore_ascii_case(module_id)),
            None => true,
        };
        enabled && !self.disabled.iter().any(|id| id.eq_ignore_ascii_case(module_id))
    }
}

/// `[splitwise]`: Splitwise API credentials.
#[derive(Clone, Deserialize)]
pub struct SplitwiseSettings {
    pub api_key: String,
    #[serde(default = "default_splitwise_url")]
    pub base_url: String,
}

fn default_splitwise_url() -> String {
    "https://secure.splitwise.com/api/v3.0".to_string()
}

impl fmt::Debug for SplitwiseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitwiseSettings")
            .field("api_key", &redacted(&self.api_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// `[openrouter]`: vision model used to read receipts.
#[derive(Clone, Deserialize)]
pub struct OpenRouterSettings {
    pub api_key: String,
    #[serde(default = "default_openrouter_model")]
    pub model: String,
    #[serde(default = "default_openrouter_url")]
    pub base_url: String,
}

fn default_openrouter_model() -> String {
    "google/gemini-2.0-flash-001:free".to_string()
}

fn default_openrouter_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

impl fmt::Debug for OpenRouterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterSettings")
            .field("api_key", &redacted(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// `[phone_bill]`: the recurring bill split.
#[derive(Debug, Clone, Deserialize)]
pub struct PhoneBillSettings {
    pub group_id: u64,
    pub total_cost: f64,
    #[serde(default = "default_bill_prefix")]
    pub description_prefix: String,
    #[serde(default)]
    pub shares: Vec<BillShare>,
}

fn default_bill_prefix() -> String {
    "Phone Bill Due".to_string()
}

/// One member's fixed share of the recurring bill.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BillShare {
    pub user_id: u64,
    pub owed: f64,
}

/// `[quick_commands]`: shell shortcuts.
#[derive(Debug, Clone, Deserialize)]
pub struct QuickCommandsSettings {
    #[serde(default = "default_command_timeout")]
    pub timeout_secs: u64,
    /// Replaces the built-in command set when non-empty.
    #[serde(default)]
    pub commands: Vec<QuickCommand>,
}

fn default_command_timeout() -> u64 {
    10
}

impl Default for QuickCommandsSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_command_timeout(),
            commands: Vec::new(),
        }
    }
}

/// A single configured shell command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuickCommand {
    pub id: String,
    pub label: String,
    pub command: String,
    pub description: String,
    #[serde(default)]
    pub variant: ActionVariant,
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<not set>"
    } else {
        "<redacted>"
    }
}
