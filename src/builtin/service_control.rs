//! Service control: a simulated start/stop/restart service.
//!
//! The action catalog follows the service state: a stopped service offers
//! `start`; a running one offers `stop` and `restart`.

use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::config::PanelConfig;
use crate::modules::{
    ActionDescriptor, ActionResult, ActionVariant, DashboardModule, FromConfig, ModuleError,
    ModuleIdentity, Params, StatusMap,
};

use super::format_uptime_seconds;

#[derive(Debug, Default)]
struct ServiceState {
    started_at: Option<Instant>,
    restart_count: u64,
}

impl ServiceState {
    fn is_running(&self) -> bool {
        self.started_at.is_some()
    }
}

/// Simulated service with a running/stopped state machine.
#[derive(Debug, Default)]
pub struct ServiceControlModule {
    state: Mutex<ServiceState>,
}

impl ServiceControlModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().is_running()
    }
}

#[async_trait]
impl DashboardModule for ServiceControlModule {
    fn identity(&self) -> ModuleIdentity {
        ModuleIdentity::new("Service Control", "Start, stop, and restart the demo service")
            .with_icon("⚡")
            .with_color("#10b981")
    }

    async fn status(&self) -> Result<StatusMap, ModuleError> {
        let state = self.state.lock();
        let mut status = StatusMap::new();
        status.insert(
            "status".into(),
            Value::from(if state.is_running() { "Running" } else { "Stopped" }),
        );
        status.insert("restart_count".into(), Value::from(state.restart_count));
        if let Some(started_at) = state.started_at {
            status.insert(
                "uptime".into(),
                Value::from(format_uptime_seconds(started_at.elapsed())),
            );
        }
        Ok(status)
    }

    fn actions(&self) -> Vec<ActionDescriptor> {
        if self.is_running() {
            vec![
                ActionDescriptor::new("stop", "⏹️ Stop Service", ActionVariant::Danger),
                ActionDescriptor::new("restart", "🔄 Restart Service", ActionVariant::Warning),
            ]
        } else {
            vec![ActionDescriptor::new("start", "▶️ Start Service", ActionVariant::Success)]
        }
    }

    async fn execute(&self, action_id: &str, _params: &Params) -> ActionResult {
        let mut state = self.state.lock();
        match action_id {
            "start" => {
                if state.is_running() {
                    return ActionResult::fail("Service is already running");
                }
                state.started_at = Some(Instant::now());
                ActionResult::ok("Service started successfully")
            }
            "stop" => {
                if !state.is_running() {
                    return ActionResult::fail("Service is already stopped");
                }
                state.started_at = None;
                ActionResult::ok("Service stopped successfully")
            }
            "restart" => {
                if !state.is_running() {
                    return ActionResult::fail("Service is not running");
                }
                state.started_at = Some(Instant::now());
                state.restart_count += 1;
                ActionResult::ok("Service restarted successfully")
            }
            other => ActionResult::unknown_action(other),
        }
    }
}

impl FromConfig for ServiceControlModule {
    fn from_config(_config: &PanelConfig) -> Result<Self, ModuleError> {
        Ok(Self::new())
    }
}
