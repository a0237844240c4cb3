//! Module loader: turns the compiled-in manifest into live instances.
//!
//! Rust has no runtime type discovery, so the set of candidate modules is an
//! explicit manifest of [`ModuleFactory`] values.  Loading:
//! 1. Reads the module configuration file
//! 2. Filters the manifest through its `[modules]` selection
//! 3. Constructs each remaining candidate, skipping (and logging) failures
//! 4. Derives each id from the implementing type name, lower-cased
//!
//! Colliding ids are resolved last-loaded-wins, with a warning.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::PanelConfig;

use super::error::ModuleError;
use super::module_base::{DashboardModule, FromConfig};

// ============================================================================
// ModuleFactory
// ============================================================================

type BuildFn = fn(&PanelConfig) -> Result<Arc<dyn DashboardModule>, ModuleError>;

/// One manifest entry: the implementing type's name plus its constructor.
#[derive(Clone, Copy)]
pub struct ModuleFactory {
    type_name: &'static str,
    build: BuildFn,
}

impl ModuleFactory {
    /// Factory for a concrete module type.
    pub fn of<M: FromConfig>() -> Self {
        Self {
            type_name: std::any::type_name::<M>(),
            build: |config| {
                let module: Arc<dyn DashboardModule> = Arc::new(M::from_config(config)?);
                Ok(module)
            },
        }
    }

    /// Fully qualified name of the implementing type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Registry id for this factory's modules.
    pub fn module_id(&self) -> String {
        derive_module_id(self.type_name)
    }

    /// Construct a fresh instance.
    pub fn build(&self, config: &PanelConfig) -> Result<Arc<dyn DashboardModule>, ModuleError> {
        (self.build)(config)
    }
}

impl std::fmt::Debug for ModuleFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleFactory")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Derive a registry id from a type name: the last path segment, without
/// generic arguments, lower-cased.
///
/// `control_panel::builtin::system_info::SystemInfoModule` → `systeminfomodule`
pub fn derive_module_id(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base).to_lowercase()
}

// ============================================================================
// Load report
// ============================================================================

/// A module that failed to construct.
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub module_id: String,
    pub error: String,
}

/// Result of one discovery pass.
pub struct LoadedModules {
    /// Loaded instances in manifest order, ids unique.
    pub modules: Vec<(String, Arc<dyn DashboardModule>)>,
    /// Candidates that failed to construct.
    pub failures: Vec<LoadFailure>,
    /// Candidates excluded by the `[modules]` selection.
    pub skipped: Vec<String>,
}

impl LoadedModules {
    pub fn count(&self) -> usize {
        self.modules.len()
    }
}

// ============================================================================
// ModuleLoader
// ============================================================================

/// Instantiates the module manifest against the module configuration file.
#[derive(Debug, Clone)]
pub struct ModuleLoader {
    manifest: Vec<ModuleFactory>,
    config_path: Option<PathBuf>,
}

impl ModuleLoader {
    /// Loader over an explicit manifest, with no configuration file.
    pub fn new(manifest: Vec<ModuleFactory>) -> Self {
        Self {
            manifest,
            config_path: None,
        }
    }

    /// Loader over the built-in modules.
    pub fn with_builtins() -> Self {
        Self::new(crate::builtin::manifest())
    }

    /// Read module configuration from this file on every load (builder-style).
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Re-read the configuration file and load every selected module.
    pub fn load_all(&self) -> LoadedModules {
        let config = match &self.config_path {
            Some(path) => PanelConfig::load_or_default(path),
            None => PanelConfig::default(),
        };
        self.load_with(&config)
    }

    /// Load every selected module against an already-parsed configuration.
    ///
    /// Never fails as a whole: construction errors are recorded per
    /// candidate and the remaining modules still load.
    pub fn load_with(&self, config: &PanelConfig) -> LoadedModules {
        let mut modules: Vec<(String, Arc<dyn DashboardModule>)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut failures = Vec::new();
        let mut skipped = Vec::new();

        for factory in &self.manifest {
            let module_id = factory.module_id();

            if !config.modules.allows(&module_id) {
                log::debug!("Module {} disabled by configuration", module_id);
                skipped.push(module_id);
                continue;
            }

            match factory.build(config) {
                Ok(instance) => {
                    log::info!("Loaded module: {} ({})", instance.identity().name, module_id);
                    if let Some(&pos) = positions.get(&module_id) {
                        log::warn!(
                            "Module id collision on '{}' ({}); replacing earlier instance",
                            module_id,
                            factory.type_name()
                        );
                        modules[pos].1 = instance;
                    } else {
                        positions.insert(module_id.clone(), modules.len());
                        modules.push((module_id, instance));
                    }
                }
                Err(e) => {
                    log::error!("Error loading module {}: {}", module_id, e);
                    failures.push(LoadFailure {
                        module_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        log::info!("Total modules loaded: {}", modules.len());

        LoadedModules {
            modules,
            failures,
            skipped,
        }
    }
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::with_builtins()
    }
}
