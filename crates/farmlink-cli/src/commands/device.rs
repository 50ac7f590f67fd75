//! Device-control commands

use std::path::{Path, PathBuf};

use colored::Colorize;
use farmlink_core::{Confirmer, DeviceActions, GAME_PACKAGE};

use super::print_report;
use crate::context::Session;
use crate::error::Result;

/// Push all mods and configs to the device.
pub fn run_deploy(session: &Session, confirmer: &mut dyn Confirmer) -> Result<()> {
    session.print_device_banner();
    let engine = session.engine()?;

    let mods = engine.push_all_mods(confirmer)?;
    print_report("mods", &mods);
    let configs = engine.push_all_configs()?;
    print_report("configs", &configs);
    Ok(())
}

/// Pull the current SMAPI log into the mirror root.
pub fn run_logs(session: &Session) -> Result<()> {
    let transport = session.require_transport()?;
    let actions = DeviceActions::new(transport, session.ctx);
    let dest = actions.pull_log(session.layout.root())?;
    println!("{} log saved to {}", "ok".green().bold(), dest.display());
    Ok(())
}

/// Force-stop and relaunch the game.
///
/// A tap given on the command line is stored in the device profile; without
/// one, the profile's stored tap is used.
pub fn run_launch(session: &mut Session, tap: Option<(u32, u32)>) -> Result<()> {
    let identity = session.require_transport()?.identity().to_string();

    if tap.is_some() {
        session.profiles.set_tap(&identity, tap);
        session.profiles.save()?;
    }
    let tap = tap.or_else(|| session.profiles.get(&identity).and_then(|p| p.tap));

    let transport = session.require_transport()?;
    let actions = DeviceActions::new(transport, session.ctx);
    actions.launch(tap)?;
    println!("{} launched {}", "ok".green().bold(), GAME_PACKAGE.cyan());
    Ok(())
}

/// Show whether the game package is installed.
pub fn run_apk_status(session: &Session) -> Result<()> {
    let transport = session.require_transport()?;
    let status = DeviceActions::new(transport, session.ctx).apk_status()?;

    if status.installed() {
        println!("{}: {}", "Package".dimmed(), GAME_PACKAGE.cyan());
        println!(
            "{}: {}",
            "Version".dimmed(),
            status.version.as_deref().unwrap_or("unknown")
        );
        if let Some(path) = &status.apk_path {
            println!("{}:    {}", "Path".dimmed(), path);
        }
    } else {
        println!("{} is {}", GAME_PACKAGE.cyan(), "not installed".yellow());
    }
    Ok(())
}

/// Pull the installed game APK.
pub fn run_apk_pull(session: &Session, dest: Option<PathBuf>) -> Result<()> {
    let transport = session.require_transport()?;
    let dest_dir = dest.unwrap_or_else(|| session.layout.downloads_dir());
    std::fs::create_dir_all(&dest_dir)?;

    let path = DeviceActions::new(transport, session.ctx).apk_pull(&dest_dir)?;
    println!("{} APK saved to {}", "ok".green().bold(), path.display());
    Ok(())
}

/// Install an APK on the device.
pub fn run_apk_install(session: &Session, apk: &Path) -> Result<()> {
    let transport = session.require_transport()?;
    DeviceActions::new(transport, session.ctx).apk_install(apk)?;
    println!("{} installed {}", "ok".green().bold(), apk.display());
    Ok(())
}

/// Install the SMAPI loader and wait for its data root.
pub fn run_smapi_install(session: &Session, apk: &Path) -> Result<()> {
    let transport = session.require_transport()?;
    DeviceActions::new(transport, session.ctx).smapi_install(apk)?;
    println!(
        "{} SMAPI loader installed; data root is present",
        "ok".green().bold()
    );
    println!(
        "Run {} to copy mods onto the device.",
        "farmlink deploy".cyan()
    );
    Ok(())
}
