//! Update check and install commands

use std::path::Path;

use colored::Colorize;
use dialoguer::Confirm;
use farmlink_core::{
    Confirmer, InstallOutcome, ManualFetch, ModInstaller, ModUpdate, SyncReport, UpdateChecker,
    UpdateHost, scan_manifests,
};
use tracing::warn;

use crate::context::Session;
use crate::error::{CliError, Result};

/// Check the catalog and list available updates.
pub fn run_check_updates(session: &Session) -> Result<()> {
    let updates = available_updates(session)?;
    if updates.is_empty() {
        println!("{}", "All mods are up to date".green());
        return Ok(());
    }

    println!("{}:", "Updates available".bold());
    for update in &updates {
        println!(
            "  {} {} {} {} {} ({})",
            "+".green(),
            update.manifest.name.cyan(),
            update.manifest.version,
            "->".dimmed(),
            update.suggested_version.bold(),
            host_label(&update.host)
        );
    }
    Ok(())
}

/// Download and install updates, optionally restricted to one mod.
pub fn run_update(
    session: &Session,
    name: Option<&str>,
    confirmer: &mut dyn Confirmer,
) -> Result<()> {
    let mut updates = available_updates(session)?;
    if let Some(name) = name {
        updates.retain(|u| {
            u.manifest.name.eq_ignore_ascii_case(name)
                || u.manifest.unique_id.eq_ignore_ascii_case(name)
        });
        if updates.is_empty() {
            return Err(CliError::user(format!("no update available for '{name}'")));
        }
    }
    if updates.is_empty() {
        println!("{}", "All mods are up to date".green());
        return Ok(());
    }

    let installer = ModInstaller::new(session.layout.clone(), &session.config, session.ctx)?;
    let mut manual = PromptManualFetch;
    let mut installed = 0usize;

    for update in &updates {
        let prompt = format!(
            "Update '{}' {} -> {}?",
            update.manifest.name, update.manifest.version, update.suggested_version
        );
        if !session.ctx.force && !confirmer.confirm(&prompt, true) {
            continue;
        }

        // One candidate's failure abandons only that candidate.
        match installer.install(update, &mut manual) {
            Ok(InstallOutcome::Installed { dir, source }) => {
                println!(
                    "{} installed '{}' {} (from {source:?}) at {}",
                    "ok".green().bold(),
                    update.manifest.name,
                    update.suggested_version,
                    dir.display()
                );
                installed += 1;
                push_to_device(session, update);
            }
            Ok(InstallOutcome::DryRun) => {
                println!(
                    "  would update '{}' {} -> {}",
                    update.manifest.name, update.manifest.version, update.suggested_version
                );
            }
            Err(e) => {
                println!(
                    "{} '{}': {e}",
                    "failed".red().bold(),
                    update.manifest.name
                );
            }
        }
    }

    if installed > 0 {
        println!("{installed} of {} updates installed", updates.len());
    }
    Ok(())
}

fn available_updates(session: &Session) -> Result<Vec<ModUpdate>> {
    let manifests = scan_manifests(&session.layout.mods_dir())?;
    if manifests.is_empty() {
        return Ok(Vec::new());
    }
    Ok(UpdateChecker::new()?.check(&manifests)?)
}

/// Push a freshly installed mod to the device, when one is connected.
fn push_to_device(session: &Session, update: &ModUpdate) {
    let Ok(engine) = session.engine() else {
        return;
    };
    let Some(folder) = top_level_folder(&update.manifest.relative_dir) else {
        return;
    };
    let mut report = SyncReport::new();
    engine.push_mod(&folder, &mut report);
    for error in &report.errors {
        warn!("{error}");
    }
    if report.pushed > 0 {
        println!("  pushed '{folder}' to the device");
    }
}

/// The mod's top-level folder under the mods root; nested sub-mods deploy
/// with their parent.
fn top_level_folder(relative_dir: &Path) -> Option<String> {
    relative_dir
        .components()
        .next()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
}

fn host_label(host: &UpdateHost) -> String {
    match host {
        UpdateHost::Nexus { mod_id } => format!("Nexus #{mod_id}"),
        UpdateHost::GitHub { repo } => format!("GitHub {repo}"),
        UpdateHost::Unknown => "manual".to_string(),
    }
}

/// Manual download tier backed by a terminal prompt.
struct PromptManualFetch;

impl ManualFetch for PromptManualFetch {
    fn wait_for_archive(&mut self, mod_name: &str, holding_dir: &Path) -> bool {
        println!(
            "Download '{}' in the browser and save the archive to {}",
            mod_name.cyan(),
            holding_dir.display()
        );
        Confirm::new()
            .with_prompt("Archive saved?")
            .default(true)
            .interact()
            .unwrap_or(false)
    }
}
