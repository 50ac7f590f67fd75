//! ReconciliationEngine implementation
//!
//! Drives save sync (bidirectional, confirmation-gated, backup before
//! overwrite), config sync (bidirectional, unconditional newer-wins), the
//! push-missing mods flow, and the explicit one-way flows. Per-item failures
//! are logged into the report and the batch continues; only the absence of a
//! transport is fatal to an invocation, and that is decided before the
//! engine exists.

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::backup::BackupManager;
use crate::config::{AppConfig, RunContext};
use crate::error::Result;
use crate::layout::LocalLayout;
use crate::sync::candidate::{Decision, SyncCandidate, decide};
use farmlink_transport::{DevicePath, FileOps};

/// Name of the per-mod configuration file, on both sides.
const CONFIG_FILE: &str = "config.json";

/// Logical name for the fixed internal configuration candidate.
const INTERNAL_CONFIG: &str = "smapi-internal";

/// Report from one sync flow.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub pulled: usize,
    pub pushed: usize,
    pub skipped: usize,
    /// Actions taken (or simulated) during the flow.
    pub actions: Vec<String>,
    /// Per-item failures; the flow continued past each of them.
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    fn action(&mut self, action: impl Into<String>) {
        self.actions.push(action.into());
    }

    fn error(&mut self, error: impl Into<String>) {
        let error = error.into();
        warn!("{error}");
        self.errors.push(error);
    }
}

/// Confirmation gate for individual sync actions.
///
/// The CLI backs this with a terminal prompt; forced mode bypasses it
/// entirely, and tests script it.
pub trait Confirmer {
    fn confirm(&mut self, prompt: &str, default_yes: bool) -> bool;
}

/// Drives bidirectional and push-missing reconciliation over one transport.
pub struct ReconciliationEngine<'a, F: FileOps> {
    ops: &'a F,
    layout: LocalLayout,
    backups: BackupManager,
    tolerance: Duration,
    ctx: RunContext,
}

impl<'a, F: FileOps> ReconciliationEngine<'a, F> {
    pub fn new(ops: &'a F, layout: LocalLayout, config: &AppConfig, ctx: RunContext) -> Self {
        let backups = BackupManager::new(
            layout.saves_dir(),
            layout.backups_dir(),
            config.backup_retention,
        );
        Self {
            ops,
            layout,
            backups,
            tolerance: Duration::seconds(config.tolerance_secs),
            ctx,
        }
    }

    // ----- saves: bidirectional -----

    /// Bidirectional save sync over the union of local and device names.
    pub fn sync_saves(&self, confirmer: &mut dyn Confirmer) -> Result<SyncReport> {
        let mut report = SyncReport::new();

        for candidate in self.save_candidates()? {
            let name = candidate.name.clone();
            match decide(&candidate, self.tolerance) {
                Decision::InSync => {
                    debug!(save = %name, "already in sync");
                    report.skipped += 1;
                }
                Decision::Undecidable => {
                    report.action(format!(
                        "skipped '{name}': modification times unavailable"
                    ));
                    report.skipped += 1;
                }
                Decision::Pull { backup, default_yes } => {
                    let prompt = format!("Pull save '{name}' from device?");
                    if !self.confirmed(confirmer, &prompt, default_yes) {
                        report.skipped += 1;
                        continue;
                    }
                    self.pull_save(&name, backup, &mut report);
                }
                Decision::Push { default_yes } => {
                    let prompt = format!("Push save '{name}' to device?");
                    if !self.confirmed(confirmer, &prompt, default_yes) {
                        report.skipped += 1;
                        continue;
                    }
                    self.push_save(&name, &mut report);
                }
            }
        }

        self.append_sync_log("saves", &report)?;
        Ok(report)
    }

    /// Pull every device save, confirmation-gated, backing up any local
    /// copy first.
    pub fn pull_all_saves(&self, confirmer: &mut dyn Confirmer) -> Result<SyncReport> {
        let mut report = SyncReport::new();
        for name in self.device_names(&DevicePath::saves())? {
            let prompt = format!("Pull save '{name}' from device?");
            if !self.confirmed(confirmer, &prompt, true) {
                report.skipped += 1;
                continue;
            }
            let backup = self.layout.saves_dir().join(&name).is_dir();
            self.pull_save(&name, backup, &mut report);
        }
        Ok(report)
    }

    /// Push every local save, confirmation-gated.
    pub fn push_all_saves(&self, confirmer: &mut dyn Confirmer) -> Result<SyncReport> {
        let mut report = SyncReport::new();
        for name in LocalLayout::subdir_names(&self.layout.saves_dir())? {
            let prompt = format!("Push save '{name}' to device?");
            if !self.confirmed(confirmer, &prompt, true) {
                report.skipped += 1;
                continue;
            }
            self.push_save(&name, &mut report);
        }
        Ok(report)
    }

    fn pull_save(&self, name: &str, backup: bool, report: &mut SyncReport) {
        if backup && !self.ctx.dry_run {
            if let Err(e) = self.backups.backup(name) {
                report.error(format!("backup of '{name}' failed: {e}"));
                report.skipped += 1;
                return;
            }
        }
        let device = DevicePath::saves().join(name);
        let local = self.layout.saves_dir().join(name);
        match self.ops.pull_folder(&device, &local) {
            Ok(()) => {
                report.action(format!("pulled save '{name}'"));
                report.pulled += 1;
            }
            Err(e) => report.error(format!("pull of '{name}' failed: {e}")),
        }
    }

    fn push_save(&self, name: &str, report: &mut SyncReport) {
        let device = DevicePath::saves().join(name);
        let local = self.layout.saves_dir().join(name);
        match self.ops.push_folder(&device, &local) {
            Ok(()) => {
                report.action(format!("pushed save '{name}'"));
                report.pushed += 1;
            }
            Err(e) => report.error(format!("push of '{name}' failed: {e}")),
        }
    }

    fn save_candidates(&self) -> Result<Vec<SyncCandidate>> {
        let local: BTreeSet<String> =
            LocalLayout::subdir_names(&self.layout.saves_dir())?.into_iter().collect();
        let device: BTreeSet<String> =
            self.device_names(&DevicePath::saves())?.into_iter().collect();

        let mut candidates = Vec::new();
        for name in local.union(&device) {
            let local_exists = local.contains(name);
            let device_exists = device.contains(name);
            // Timestamps are only needed for the both-present tie-break.
            let (local_modified, device_modified) = if local_exists && device_exists {
                (
                    local_mtime(&self.layout.saves_dir().join(name)),
                    self.ops
                        .modified_at(&DevicePath::saves(), name)
                        .unwrap_or_default(),
                )
            } else {
                (None, None)
            };
            candidates.push(SyncCandidate {
                name: name.clone(),
                local_exists,
                device_exists,
                local_modified,
                device_modified,
            });
        }
        Ok(candidates)
    }

    // ----- configs: bidirectional, unconditional -----

    /// Bidirectional config sync: per-mod `config.json` plus the fixed
    /// internal configuration. Never prompts, never backs up; the newer
    /// side wins unconditionally.
    pub fn sync_configs(&self) -> Result<SyncReport> {
        let mut report = SyncReport::new();

        for name in self.config_candidate_names()? {
            let device_dir = self.config_device_dir(&name);
            let candidate = self.config_candidate(&name, &device_dir)?;
            match decide(&candidate, self.tolerance) {
                Decision::InSync => report.skipped += 1,
                Decision::Undecidable => {
                    report.action(format!(
                        "skipped config '{name}': modification times unavailable"
                    ));
                    report.skipped += 1;
                }
                Decision::Pull { .. } => self.pull_config(&name, &device_dir, &mut report),
                Decision::Push { .. } => self.push_config(&name, &device_dir, &mut report),
            }
        }
        Ok(report)
    }

    /// Push every local config absent on the device; device-only configs
    /// are reported but never adopted.
    pub fn push_missing_configs(&self) -> Result<SyncReport> {
        let mut report = SyncReport::new();
        for name in self.config_candidate_names()? {
            let device_dir = self.config_device_dir(&name);
            let candidate = self.config_candidate(&name, &device_dir)?;
            match (candidate.local_exists, candidate.device_exists) {
                (true, false) => self.push_config(&name, &device_dir, &mut report),
                (false, true) => {
                    report.action(format!("config '{name}' exists only on the device"));
                    report.skipped += 1;
                }
                _ => report.skipped += 1,
            }
        }
        Ok(report)
    }

    /// Pull every device-side config over the local mirror.
    pub fn pull_all_configs(&self) -> Result<SyncReport> {
        let mut report = SyncReport::new();
        for name in self.config_candidate_names()? {
            let device_dir = self.config_device_dir(&name);
            let candidate = self.config_candidate(&name, &device_dir)?;
            if candidate.device_exists {
                self.pull_config(&name, &device_dir, &mut report);
            } else {
                report.skipped += 1;
            }
        }
        Ok(report)
    }

    /// Push every local config over the device copy.
    pub fn push_all_configs(&self) -> Result<SyncReport> {
        let mut report = SyncReport::new();
        for name in self.config_candidate_names()? {
            let device_dir = self.config_device_dir(&name);
            let candidate = self.config_candidate(&name, &device_dir)?;
            if candidate.local_exists {
                self.push_config(&name, &device_dir, &mut report);
            } else {
                report.skipped += 1;
            }
        }
        Ok(report)
    }

    fn config_device_dir(&self, name: &str) -> DevicePath {
        if name == INTERNAL_CONFIG {
            DevicePath::smapi_internal()
        } else {
            DevicePath::mods().join(name)
        }
    }

    fn local_config_path(&self, name: &str) -> PathBuf {
        self.layout.configs_dir().join(name).join(CONFIG_FILE)
    }

    fn config_candidate_names(&self) -> Result<Vec<String>> {
        let mut names: BTreeSet<String> =
            LocalLayout::subdir_names(&self.layout.configs_dir())?.into_iter().collect();
        for name in self.device_names(&DevicePath::mods())? {
            names.insert(name);
        }
        names.insert(INTERNAL_CONFIG.to_string());
        Ok(names.into_iter().collect())
    }

    fn config_candidate(&self, name: &str, device_dir: &DevicePath) -> Result<SyncCandidate> {
        let local_path = self.local_config_path(name);
        let local_exists = local_path.is_file();

        let device_exists = self
            .ops
            .list_dir(device_dir)?
            .iter()
            .any(|e| !e.is_dir && e.name == CONFIG_FILE);

        let (local_modified, device_modified) = if local_exists && device_exists {
            (
                local_mtime(&local_path),
                self.ops
                    .modified_at(device_dir, CONFIG_FILE)
                    .unwrap_or_default(),
            )
        } else {
            (None, None)
        };

        Ok(SyncCandidate {
            name: name.to_string(),
            local_exists,
            device_exists,
            local_modified,
            device_modified,
        })
    }

    fn pull_config(&self, name: &str, device_dir: &DevicePath, report: &mut SyncReport) {
        let local = self.local_config_path(name);
        match self.ops.pull_file(device_dir, CONFIG_FILE, &local) {
            Ok(()) => {
                report.action(format!("pulled config for '{name}'"));
                report.pulled += 1;
            }
            Err(e) => report.error(format!("config pull for '{name}' failed: {e}")),
        }
    }

    fn push_config(&self, name: &str, device_dir: &DevicePath, report: &mut SyncReport) {
        let local = self.local_config_path(name);
        match self.ops.push_file(device_dir, &local) {
            Ok(()) => {
                report.action(format!("pushed config for '{name}'"));
                report.pushed += 1;
            }
            Err(e) => report.error(format!("config push for '{name}' failed: {e}")),
        }
    }

    // ----- mods: push-missing and explicit one-way -----

    /// Push every local mod absent on the device by name. Device-only mods
    /// are reported, never auto-pulled: adopting device content into the
    /// authoritative local set must stay an explicit operation.
    pub fn push_missing_mods(&self) -> Result<SyncReport> {
        let mut report = SyncReport::new();

        let local: BTreeSet<String> =
            LocalLayout::subdir_names(&self.layout.mods_dir())?.into_iter().collect();
        let device: BTreeSet<String> =
            self.device_names(&DevicePath::mods())?.into_iter().collect();

        for name in &local {
            if device.contains(name) {
                debug!(module = %name, "mod already present on device");
                report.skipped += 1;
                continue;
            }
            self.push_mod(name, &mut report);
        }

        for name in device.difference(&local) {
            report.action(format!("mod '{name}' exists only on the device"));
            report.skipped += 1;
        }
        Ok(report)
    }

    /// Pull every device mod, confirmation-gated.
    pub fn pull_all_mods(&self, confirmer: &mut dyn Confirmer) -> Result<SyncReport> {
        let mut report = SyncReport::new();
        for name in self.device_names(&DevicePath::mods())? {
            let prompt = format!("Pull mod '{name}' from device?");
            if !self.confirmed(confirmer, &prompt, true) {
                report.skipped += 1;
                continue;
            }
            let device = DevicePath::mods().join(&name);
            let local = self.layout.mods_dir().join(&name);
            match self.ops.pull_folder(&device, &local) {
                Ok(()) => {
                    report.action(format!("pulled mod '{name}'"));
                    report.pulled += 1;
                }
                Err(e) => report.error(format!("pull of mod '{name}' failed: {e}")),
            }
        }
        Ok(report)
    }

    /// Push every local mod, confirmation-gated.
    pub fn push_all_mods(&self, confirmer: &mut dyn Confirmer) -> Result<SyncReport> {
        let mut report = SyncReport::new();
        for name in LocalLayout::subdir_names(&self.layout.mods_dir())? {
            let prompt = format!("Push mod '{name}' to device?");
            if !self.confirmed(confirmer, &prompt, true) {
                report.skipped += 1;
                continue;
            }
            self.push_mod(&name, &mut report);
        }
        Ok(report)
    }

    /// Push one named mod folder to the device.
    pub fn push_mod(&self, name: &str, report: &mut SyncReport) {
        let device = DevicePath::mods().join(name);
        let local = self.layout.mods_dir().join(name);
        match self.ops.push_folder(&device, &local) {
            Ok(()) => {
                report.action(format!("pushed mod '{name}'"));
                report.pushed += 1;
            }
            Err(e) => report.error(format!("push of mod '{name}' failed: {e}")),
        }
    }

    // ----- shared helpers -----

    fn confirmed(&self, confirmer: &mut dyn Confirmer, prompt: &str, default_yes: bool) -> bool {
        if self.ctx.force {
            return true;
        }
        confirmer.confirm(prompt, default_yes)
    }

    fn device_names(&self, root: &DevicePath) -> Result<Vec<String>> {
        Ok(self
            .ops
            .list_dir(root)?
            .into_iter()
            .filter(|e| e.is_dir)
            .map(|e| e.name)
            .collect())
    }

    fn append_sync_log(&self, flow: &str, report: &SyncReport) -> Result<()> {
        if self.ctx.dry_run {
            return Ok(());
        }
        if let Some(parent) = self.layout.sync_log().parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.layout.sync_log())?;
        writeln!(
            file,
            "{} {} pulled={} pushed={} skipped={} errors={}",
            Utc::now().to_rfc3339(),
            flow,
            report.pulled,
            report.pushed,
            report.skipped,
            report.errors.len()
        )?;
        Ok(())
    }
}

fn local_mtime(path: &Path) -> Option<DateTime<Utc>> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}
