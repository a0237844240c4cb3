//! Built-in panel modules and the compiled-in module manifest.
//!
//! | Module | Id | Needs config |
//! |---|---|---|
//! | [`SystemInfoModule`] | `systeminfomodule` | no |
//! | [`ServiceControlModule`] | `servicecontrolmodule` | no |
//! | [`QuickCommandsModule`] | `quickcommandsmodule` | optional `[quick_commands]` |
//! | [`ReceiptSplitterModule`] | `receiptsplittermodule` | `[splitwise]`, `[openrouter]` |
//! | [`SplitwisePhoneBillModule`] | `splitwisephonebillmodule` | `[splitwise]`, `[phone_bill]` |
//!
//! Adding a module means implementing [`DashboardModule`] + [`FromConfig`]
//! and appending it to [`manifest`].
//!
//! [`DashboardModule`]: crate::modules::DashboardModule
//! [`FromConfig`]: crate::modules::FromConfig

pub mod phone_bill;
pub mod quick_commands;
pub mod receipt_splitter;
pub mod service_control;
pub mod system_info;

use std::time::Duration;

use crate::modules::ModuleFactory;

pub use phone_bill::SplitwisePhoneBillModule;
pub use quick_commands::QuickCommandsModule;
pub use receipt_splitter::ReceiptSplitterModule;
pub use service_control::ServiceControlModule;
pub use system_info::SystemInfoModule;

/// Every module compiled into the panel, in display order.
pub fn manifest() -> Vec<ModuleFactory> {
    vec![
        ModuleFactory::of::<QuickCommandsModule>(),
        ModuleFactory::of::<ReceiptSplitterModule>(),
        ModuleFactory::of::<ServiceControlModule>(),
        ModuleFactory::of::<SplitwisePhoneBillModule>(),
        ModuleFactory::of::<SystemInfoModule>(),
    ]
}

// ---------------------------------------------------------------------------
// Shared formatting
// ---------------------------------------------------------------------------

fn uptime_parts(elapsed: Duration) -> (u64, u64, u64, u64) {
    let total = elapsed.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    (days, hours, minutes, seconds)
}

/// `"2d 3h 4m"`; zero components are omitted, `"< 1m"` under a minute.
pub fn format_uptime_minutes(elapsed: Duration) -> String {
    let (days, hours, minutes, _) = uptime_parts(elapsed);
    let parts = join_parts(days, hours, minutes);
    if parts.is_empty() {
        "< 1m".to_string()
    } else {
        parts.join(" ")
    }
}

/// Like [`format_uptime_minutes`], but shows seconds when nothing larger
/// applies, and `"< 1s"` for zero.
pub fn format_uptime_seconds(elapsed: Duration) -> String {
    let (days, hours, minutes, seconds) = uptime_parts(elapsed);
    let mut parts = join_parts(days, hours, minutes);
    if parts.is_empty() && seconds > 0 {
        parts.push(format!("{}s", seconds));
    }
    if parts.is_empty() {
        "< 1s".to_string()
    } else {
        parts.join(" ")
    }
}

fn join_parts(days: u64, hours: u64, minutes: u64) -> Vec<String> {
    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_ids_are_unique() {
        let mut ids: Vec<String> = manifest().iter().map(|f| f.module_id()).collect();
        assert_eq!(
            ids,
            vec![
                "quickcommandsmodule",
                "receiptsplittermodule",
                "servicecontrolmodule",
                "splitwisephonebillmodule",
                "systeminfomodule",
            ]
        );
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_format_uptime_minutes() {
        assert_eq!(format_uptime_minutes(Duration::from_secs(59)), "< 1m");
        assert_eq!(format_uptime_minutes(Duration::from_secs(3600 + 120)), "1h 2m");
        assert_eq!(format_uptime_minutes(Duration::from_secs(2 * 86_400 + 5)), "2d");
    }

    #[test]
    fn test_format_uptime_seconds() {
        assert_eq!(format_uptime_seconds(Duration::ZERO), "< 1s");
        assert_eq!(format_uptime_seconds(Duration::from_secs(42)), "42s");
        assert_eq!(format_uptime_seconds(Duration::from_secs(62)), "1m");
    }
}
