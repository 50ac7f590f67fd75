//! Status command implementation

use colored::Colorize;
use farmlink_core::{LocalLayout, scan_manifests};

use crate::context::Session;
use crate::error::Result;

/// Show device, profile, and local-mirror status.
///
/// Tolerates an absent device; status is the one command that reports
/// "not connected" instead of failing.
pub fn run_status(session: &Session) -> Result<()> {
    println!("{}", "FarmLink Status".bold());
    println!();

    match &session.transport {
        Some(t) => {
            println!("{}:   {}", "Device".dimmed(), t.display_name().cyan());
            println!("{}:    {}", "Model".dimmed(), t.model());
            println!("{}: {}", "Transport".dimmed(), t.kind().to_string().cyan());
            println!(
                "{}: {}",
                "Commands".dimmed(),
                if t.can_execute_commands() {
                    "available".green()
                } else {
                    "unavailable".yellow()
                }
            );
        }
        None => println!("{}", "No device connected".yellow()),
    }
    println!();

    println!("{}:  {}", "Mirror".dimmed(), session.layout.root().display());
    let saves = LocalLayout::subdir_names(&session.layout.saves_dir())?;
    println!("{}:   {}", "Saves".dimmed(), saves.len());
    for save in &saves {
        println!("  {} {}", "+".green(), save);
    }

    let manifests = scan_manifests(&session.layout.mods_dir())?;
    println!("{}:    {}", "Mods".dimmed(), manifests.len());
    for manifest in &manifests {
        let keys = if manifest.has_update_keys() {
            manifest.update_keys.join(", ")
        } else {
            "no update keys".to_string()
        };
        println!(
            "  {} {} {} ({})",
            "+".green(),
            manifest.name.cyan(),
            manifest.version,
            keys.dimmed()
        );
    }

    if session.profiles.iter().count() == 0 {
        return Ok(());
    }
    println!();
    println!("{}:", "Known devices".dimmed());
    for (identity, profile) in session.profiles.iter() {
        println!(
            "  {} {} ({}, last seen {})",
            "+".green(),
            profile.name.cyan(),
            identity,
            profile.last_seen.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
