//! System information: host, CPU, memory, disk, and uptime.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sysinfo::{Disks, System};
use tokio::sync::Mutex;

use crate::config::PanelConfig;
use crate::modules::{
    ActionDescriptor, ActionResult, ActionVariant, DashboardModule, FromConfig, ModuleError,
    ModuleIdentity, Params, StatusMap,
};

use super::format_uptime_minutes;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Reads live host metrics on every status request.
pub struct SystemInfoModule {
    // CPU usage is a delta between two refreshes, so the sampler is kept.
    system: Mutex<System>,
}

impl SystemInfoModule {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemInfoModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DashboardModule for SystemInfoModule {
    fn identity(&self) -> ModuleIdentity {
        ModuleIdentity::new(
            "System Information",
            "View server system information, resource usage, and uptime",
        )
        .with_icon("💻")
        .with_color("#3b82f6")
    }

    async fn status(&self) -> Result<StatusMap, ModuleError> {
        let mut system = self.system.lock().await;
        system.refresh_cpu();
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        system.refresh_cpu();
        system.refresh_memory();

        let cpu_usage = system.global_cpu_info().cpu_usage();
        let cpu_cores = system.cpus().len();
        let memory = usage_line(system.used_memory(), system.total_memory());
        drop(system);

        let disks = Disks::new_with_refreshed_list();
        let root = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == Path::new("/"))
            .or_else(|| disks.list().first());
        let disk = match root {
            Some(d) => usage_line(d.total_space().saturating_sub(d.available_space()), d.total_space()),
            None => "unavailable".to_string(),
        };

        let os = format!(
            "{} {}",
            System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            System::kernel_version().unwrap_or_default()
        );

        let mut status = StatusMap::new();
        status.insert(
            "hostname".into(),
            Value::from(System::host_name().unwrap_or_else(|| "unknown".to_string())),
        );
        status.insert("os".into(), Value::from(os.trim().to_string()));
        status.insert("cpu_usage".into(), Value::from(format!("{:.1}%", cpu_usage)));
        status.insert("cpu_cores".into(), Value::from(cpu_cores));
        status.insert("memory_usage".into(), Value::from(memory));
        status.insert("disk_usage".into(), Value::from(disk));
        status.insert(
            "uptime".into(),
            Value::from(format_uptime_minutes(Duration::from_secs(System::uptime()))),
        );
        status.insert("server_version".into(), Value::from(crate::VERSION));
        Ok(status)
    }

    fn actions(&self) -> Vec<ActionDescriptor> {
        vec![ActionDescriptor::new("refresh", "🔄 Refresh Info", ActionVariant::Primary)]
    }

    async fn execute(&self, action_id: &str, _params: &Params) -> ActionResult {
        match action_id {
            // The frontend re-reads status after every action.
            "refresh" => ActionResult::ok("System information refreshed"),
            other => ActionResult::unknown_action(other),
        }
    }
}

impl FromConfig for SystemInfoModule {
    fn from_config(_config: &PanelConfig) -> Result<Self, ModuleError> {
        Ok(Self::new())
    }
}

/// `"3.2GB / 15.5GB (20.6%)"`
fn usage_line(used: u64, total: u64) -> String {
    let percent = if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    };
    format!(
        "{:.1}GB / {:.1}GB ({:.1}%)",
        used as f64 / GIB,
        total as f64 / GIB,
        percent
    )
}
