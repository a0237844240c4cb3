//! Quick commands: one-click shell commands with a bounded runtime.
//!
//! The command set comes from `[quick_commands]` in `config.toml`; when none
//! are configured the built-in set below is used.
//!
//! ```toml
//! [quick_commands]
//! timeout_secs = 10
//!
//! [[quick_commands.commands]]
//! id = "uptime"
//! label = "⏱️ Uptime"
//! command = "uptime"
//! description = "Uptime"
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::process::Command;

use crate::config::{QuickCommand, PanelConfig};
use crate::modules::{
    ActionDescriptor, ActionResult, ActionVariant, DashboardModule, FromConfig, ModuleError,
    ModuleIdentity, Params, StatusMap,
};

/// Output previews are cut to this many characters.
const OUTPUT_PREVIEW_CHARS: usize = 200;

fn builtin_commands() -> Vec<QuickCommand> {
    let entry = |id: &str, label: &str, command: &str, description: &str, variant| QuickCommand {
        id: id.to_string(),
        label: label.to_string(),
        command: command.to_string(),
        description: description.to_string(),
        variant,
    };
    vec![
        entry("check_disk", "💾 Check Disk Space", "df -h /", "Disk space", ActionVariant::Primary),
        entry(
            "list_processes",
            "📋 List Top Processes",
            "ps aux | head -10",
            "Top processes",
            ActionVariant::Primary,
        ),
        entry(
            "network_info",
            "🌐 Network Info",
            "ifconfig 2>/dev/null || ip addr 2>/dev/null || echo 'Network info unavailable'",
            "Network info",
            ActionVariant::Primary,
        ),
        entry("date_time", "🕐 Show Date/Time", "date", "Current date/time", ActionVariant::Secondary),
    ]
}

#[derive(Debug, Default)]
struct History {
    last_command: Option<String>,
    last_run: Option<DateTime<Local>>,
    executions: u64,
}

/// Runs a fixed catalog of shell commands.
#[derive(Debug)]
pub struct QuickCommandsModule {
    commands: Vec<QuickCommand>,
    timeout: Duration,
    history: Mutex<History>,
}

impl QuickCommandsModule {
    pub fn new(commands: Vec<QuickCommand>, timeout: Duration) -> Self {
        Self {
            commands,
            timeout,
            history: Mutex::new(History::default()),
        }
    }

    fn find(&self, action_id: &str) -> Option<&QuickCommand> {
        self.commands.iter().find(|c| c.id == action_id)
    }

    async fn run(&self, entry: &QuickCommand) -> ActionResult {
        let child = Command::new("sh")
            .arg("-c")
            .arg(&entry.command)
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Err(_) => {
                log::warn!("Quick command '{}' timed out", entry.id);
                return ActionResult::fail(format!(
                    "Command timed out after {} seconds",
                    self.timeout.as_secs()
                ));
            }
            Ok(Err(e)) => return ActionResult::fail(format!("Failed to execute command: {}", e)),
            Ok(Ok(output)) => output,
        };

        {
            let mut history = self.history.lock();
            history.last_command = Some(entry.description.clone());
            history.last_run = Some(Local::now());
            history.executions += 1;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = if stdout.trim().is_empty() {
            String::from_utf8_lossy(&output.stderr).trim().to_string()
        } else {
            stdout.trim().to_string()
        };

        ActionResult::ok(format!("{} executed successfully", entry.description)).with_data(json!({
            "output": preview(&text),
            "return_code": output.status.code(),
        }))
    }
}

impl Default for QuickCommandsModule {
    fn default() -> Self {
        Self::new(builtin_commands(), Duration::from_secs(10))
    }
}

/// First [`OUTPUT_PREVIEW_CHARS`] characters, with `...` when cut.
fn preview(output: &str) -> String {
    if output.chars().count() > OUTPUT_PREVIEW_CHARS {
        let mut cut: String = output.chars().take(OUTPUT_PREVIEW_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        output.to_string()
    }
}

#[async_trait]
impl DashboardModule for QuickCommandsModule {
    fn identity(&self) -> ModuleIdentity {
        ModuleIdentity::new("Quick Commands", "Execute common server commands with a single click")
            .with_icon("⚙️")
            .with_color("#f59e0b")
    }

    async fn status(&self) -> Result<StatusMap, ModuleError> {
        let history = self.history.lock();
        let mut status = StatusMap::new();
        status.insert("total_executions".into(), Value::from(history.executions));
        if let Some(command) = &history.last_command {
            status.insert("last_command".into(), Value::from(command.clone()));
        }
        if let Some(at) = history.last_run {
            status.insert(
                "last_run".into(),
                Value::from(at.format("%Y-%m-%d %H:%M:%S").to_string()),
            );
        }
        Ok(status)
    }

    fn actions(&self) -> Vec<ActionDescriptor> {
        self.commands
            .iter()
            .map(|c| ActionDescriptor::new(c.id.clone(), c.label.clone(), c.variant))
            .collect()
    }

    async fn execute(&self, action_id: &str, _params: &Params) -> ActionResult {
        match self.find(action_id) {
            Some(entry) => self.run(entry).await,
            None => ActionResult::unknown_action(action_id),
        }
    }
}

impl FromConfig for QuickCommandsModule {
    fn from_config(config: &PanelConfig) -> Result<Self, ModuleError> {
        let settings = &config.quick_commands;
        if settings.timeout_secs == 0 {
            return Err(ModuleError::Config(
                "quick_commands.timeout_secs must be greater than zero".to_string(),
            ));
        }
        let commands = if settings.commands.is_empty() {
            builtin_commands()
        } else {
            settings.commands.clone()
        };
        Ok(Self::new(commands, Duration::from_secs(settings.timeout_secs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(id: &str, command: &str) -> QuickCommand {
        QuickCommand {
            id: id.to_string(),
            label: id.to_string(),
            command: command.to_string(),
            description: format!("Run {}", id),
            variant: ActionVariant::Secondary,
        }
    }

    #[test]
    fn test_default_catalog() {
        let module = QuickCommandsModule::default();
        let ids: Vec<String> = module.actions().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["check_disk", "list_processes", "network_info", "date_time"]);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(250);
        let cut = preview(&long);
        assert_eq!(cut.chars().count(), OUTPUT_PREVIEW_CHARS + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn test_execute_records_history() {
        let module =
            QuickCommandsModule::new(vec![custom("hello", "echo hello")], Duration::from_secs(5));
        let result = module.execute("hello", &Params::new()).await;
        assert!(result.success, "{:?}", result);
        assert_eq!(result.message.as_deref(), Some("Run hello executed successfully"));
        let data = result.data.unwrap();
        assert_eq!(data["output"], "hello");
        assert_eq!(data["return_code"], 0);

        let status = module.status().await.unwrap();
        assert_eq!(status["total_executions"], 1);
        assert_eq!(status["last_command"], "Run hello");
        assert!(status.contains_key("last_run"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_still_succeeds_with_stderr() {
        let module = QuickCommandsModule::new(
            vec![custom("fail", "echo oops >&2; exit 3")],
            Duration::from_secs(5),
        );
        let result = module.execute("fail", &Params::new()).await;
        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["output"], "oops");
        assert_eq!(data["return_code"], 3);
    }

    #[tokio::test]
    async fn test_timeout_reports_failure() {
        let module =
            QuickCommandsModule::new(vec![custom("slow", "sleep 5")], Duration::from_secs(1));
        let result = module.execute("slow", &Params::new()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Command timed out after 1 seconds"));
        assert_eq!(module.status().await.unwrap()["total_executions"], 0);
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let module = QuickCommandsModule::default();
        let result = module.execute("rm_everything", &Params::new()).await;
        assert_eq!(result.error.as_deref(), Some("Unknown action: rm_everything"));
    }

    #[test]
    fn test_from_config_prefers_configured_commands() {
        let mut config = PanelConfig::default();
        config.quick_commands.commands = vec![custom("uptime", "uptime")];
        let module = QuickCommandsModule::from_config(&config).unwrap();
        assert_eq!(module.actions().len(), 1);

        config.quick_commands.timeout_secs = 0;
        assert!(QuickCommandsModule::from_config(&config).is_err());
    }
}
