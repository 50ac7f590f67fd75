//! Command implementations for farmlink-cli

pub mod configs;
pub mod device;
pub mod mods;
pub mod saves;
pub mod status;
pub mod sync;
pub mod updates;

use colored::Colorize;
use farmlink_core::SyncReport;

pub use configs::{run_configs, run_pull_configs, run_push_configs};
pub use device::{
    run_apk_install, run_apk_pull, run_apk_status, run_deploy, run_launch, run_logs,
    run_smapi_install,
};
pub use mods::{run_mods, run_pull_mods, run_push_mods};
pub use saves::{run_pull_saves, run_push_saves, run_saves};
pub use status::run_status;
pub use sync::run_sync;
pub use updates::{run_check_updates, run_update};

/// Print one flow's report: actions, errors, and a one-line summary.
pub(crate) fn print_report(flow: &str, report: &SyncReport) {
    for action in &report.actions {
        println!("  {action}");
    }
    for error in &report.errors {
        println!("  {} {error}", "!".red().bold());
    }

    let summary = format!(
        "{} pulled, {} pushed, {} skipped",
        report.pulled, report.pushed, report.skipped
    );
    if report.success() {
        println!("{} {}: {}", "ok".green().bold(), flow, summary);
    } else {
        println!(
            "{} {}: {} ({} errors)",
            "failed".red().bold(),
            flow,
            summary,
            report.errors.len()
        );
    }
}
