//! Small modules used by the registry, gateway, and router tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::config::PanelConfig;

use super::error::ModuleError;
use super::module_base::{DashboardModule, FromConfig, Params};
use super::module_def::{ActionDescriptor, ActionResult, ActionVariant, ModuleIdentity, StatusMap};

/// Counts `increment` executions.
pub struct CounterModule {
    executions: Mutex<u64>,
}

#[async_trait]
impl DashboardModule for CounterModule {
    fn identity(&self) -> ModuleIdentity {
        ModuleIdentity::new("Counter", "Counts executions")
    }

    async fn status(&self) -> Result<StatusMap, ModuleError> {
        let mut status = StatusMap::new();
        status.insert("executions".into(), Value::from(*self.executions.lock()));
        Ok(status)
    }

    fn actions(&self) -> Vec<ActionDescriptor> {
        vec![ActionDescriptor::new("increment", "Increment", ActionVariant::Primary)]
    }

    async fn execute(&self, action_id: &str, params: &Params) -> ActionResult {
        if action_id != "increment" {
            return ActionResult::unknown_action(action_id);
        }
        let mut executions = self.executions.lock();
        *executions += 1;
        ActionResult::ok("incremented").with_data(json!({
            "executions": *executions,
            "echo": Value::Object(params.clone()),
        }))
    }
}

impl FromConfig for CounterModule {
    fn from_config(_config: &PanelConfig) -> Result<Self, ModuleError> {
        Ok(Self {
            executions: Mutex::new(0),
        })
    }
}

/// Status probe always fails.
pub struct BrokenModule;

#[async_trait]
impl DashboardModule for BrokenModule {
    fn identity(&self) -> ModuleIdentity {
        ModuleIdentity::new("Broken", "Status probe always fails")
    }

    async fn status(&self) -> Result<StatusMap, ModuleError> {
        Err(ModuleError::Probe("sensor offline".into()))
    }

    fn actions(&self) -> Vec<ActionDescriptor> {
        Vec::new()
    }

    async fn execute(&self, action_id: &str, _params: &Params) -> ActionResult {
        ActionResult::unknown_action(action_id)
    }
}

impl FromConfig for BrokenModule {
    fn from_config(_config: &PanelConfig) -> Result<Self, ModuleError> {
        Ok(Self)
    }
}

/// Panics from both `status` and `execute`.
pub struct PanickingModule;

#[async_trait]
impl DashboardModule for PanickingModule {
    fn identity(&self) -> ModuleIdentity {
        ModuleIdentity::new("Panicking", "Panics on every call")
    }

    async fn status(&self) -> Result<StatusMap, ModuleError> {
        panic!("status exploded")
    }

    fn actions(&self) -> Vec<ActionDescriptor> {
        vec![ActionDescriptor::new("boom", "Boom", ActionVariant::Danger)]
    }

    async fn execute(&self, _action_id: &str, _params: &Params) -> ActionResult {
        panic!("execute exploded")
    }
}

impl FromConfig for PanickingModule {
    fn from_config(_config: &PanelConfig) -> Result<Self, ModuleError> {
        Ok(Self)
    }
}

/// Construction always fails.
pub struct FailingConstructModule;

#[async_trait]
impl DashboardModule for FailingConstructModule {
    fn identity(&self) -> ModuleIdentity {
        ModuleIdentity::new("Never", "Never constructed")
    }

    async fn status(&self) -> Result<StatusMap, ModuleError> {
        Ok(StatusMap::new())
    }

    fn actions(&self) -> Vec<ActionDescriptor> {
        Vec::new()
    }

    async fn execute(&self, action_id: &str, _params: &Params) -> ActionResult {
        ActionResult::unknown_action(action_id)
    }
}

impl FromConfig for FailingConstructModule {
    fn from_config(_config: &PanelConfig) -> Result<Self, ModuleError> {
        Err(ModuleError::Config("missing [imaginary] section".into()))
    }
}

/// Two distinct types whose ids collide on `twin`.
macro_rules! twin_module {
    ($name:literal) => {
        pub struct Twin;

        #[async_trait]
        impl DashboardModule for Twin {
            fn identity(&self) -> ModuleIdentity {
                ModuleIdentity::new($name, "Shares its id with another module")
            }

            async fn status(&self) -> Result<StatusMap, ModuleError> {
                Ok(StatusMap::new())
            }

            fn actions(&self) -> Vec<ActionDescriptor> {
                Vec::new()
            }

            async fn execute(&self, action_id: &str, _params: &Params) -> ActionResult {
                ActionResult::unknown_action(action_id)
            }
        }

        impl FromConfig for Twin {
            fn from_config(_config: &PanelConfig) -> Result<Self, ModuleError> {
                Ok(Self)
            }
        }
    };
}

pub mod first {
    use super::*;
    twin_module!("First Twin");
}

pub mod second {
    use super::*;
    twin_module!("Second Twin");
}
