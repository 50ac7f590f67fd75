//! Media-copy (MTP) transport
//!
//! Fallback transport for devices that block direct shell file access. Rides
//! the desktop's portable-device copy interface (a GVfs MTP mount driven by
//! the `gio` CLI). The copy interface is asynchronous and offers no
//! completion callback, so deletion is a move into a scratch location
//! followed by bounded polling, and any traversal snapshots a folder's
//! children before mutating that folder.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::path::DevicePath;
use crate::shell::AdbShell;
use crate::transport::{Entry, FileOps};

/// How long to wait for an asynchronous move/delete to be observed complete.
const DELETE_TIMEOUT_SECS: u64 = 15;

/// Poll interval while waiting for completion.
const DELETE_POLL_MS: u64 = 500;

/// Scratch folder on the device used as the disposable delete target.
const SCRATCH_DIR: &str = ".farmlink-trash";

/// Earliest epoch accepted as a plausible modification time (2000-01-01).
const PLAUSIBLE_EPOCH_FLOOR: i64 = 946_684_800;

/// Listing columns probed for a modification time. The label position varies
/// by device, so each candidate is tried in order and the first value that
/// parses as a plausible date wins.
const MTIME_COLUMN_CANDIDATES: &[usize] = &[3, 2, 4, 1];

/// Transport over a portable-device (MTP) mount.
pub struct MediaTransport {
    /// GVfs mount root for the device.
    mount: PathBuf,
    identity: String,
    display_name: String,
    model: String,
    /// Command channel, present when adb works but file access is blocked.
    shell: Option<AdbShell>,
    dry_run: bool,
}

impl MediaTransport {
    pub fn new(
        mount: impl Into<PathBuf>,
        identity: impl Into<String>,
        model: impl Into<String>,
        shell: Option<AdbShell>,
        dry_run: bool,
    ) -> Self {
        let model = model.into();
        Self {
            mount: mount.into(),
            identity: identity.into(),
            display_name: model.clone(),
            model,
            shell,
            dry_run,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn shell(&self) -> Option<&AdbShell> {
        self.shell.as_ref()
    }

    /// Resolve a logical path by walking the mount one segment at a time,
    /// matching each segment by name against the parent's listing.
    fn resolve_existing(&self, path: &DevicePath) -> Result<PathBuf> {
        let mut current = self.mount.clone();
        for segment in path.media_segments() {
            let listing = gio_list(&current)?;
            if !listing.iter().any(|e| e.name == segment) {
                return Err(Error::NotFound {
                    path: path.to_string(),
                });
            }
            current.push(&segment);
        }
        Ok(current)
    }

    /// Resolve a logical path, creating any missing trailing directories.
    fn resolve_creating(&self, path: &DevicePath) -> Result<PathBuf> {
        let mut current = self.mount.clone();
        for segment in path.media_segments() {
            let listing = gio_list(&current)?;
            let next = current.join(&segment);
            if !listing.iter().any(|e| e.name == segment) {
                gio(&["mkdir", &next.to_string_lossy()])?;
            }
            current = next;
        }
        Ok(current)
    }

    fn item_exists(&self, dir: &Path, name: &str) -> bool {
        gio_list(dir)
            .map(|entries| entries.iter().any(|e| e.name == name))
            .unwrap_or(false)
    }

    fn copy_folder_from_device(&self, device_dir: &Path, local_dest: &Path) -> Result<()> {
        fs::create_dir_all(local_dest).map_err(|e| Error::io(local_dest, e))?;
        // Snapshot before copying: the listing handle is invalidated by
        // concurrent mutation of the same folder.
        let entries = gio_list(device_dir)?;
        for entry in entries {
            let src = device_dir.join(&entry.name);
            let dest = local_dest.join(&entry.name);
            if entry.is_dir {
                self.copy_folder_from_device(&src, &dest)?;
            } else {
                gio(&["copy", &src.to_string_lossy(), &dest.to_string_lossy()])?;
            }
        }
        Ok(())
    }

    fn copy_folder_to_device(&self, local_dir: &Path, device_dir: &Path) -> Result<()> {
        // Snapshot the local children too; keeps the traversal order fixed
        // while copies land.
        let mut children = Vec::new();
        for entry in fs::read_dir(local_dir).map_err(|e| Error::io(local_dir, e))? {
            let entry = entry.map_err(|e| Error::io(local_dir, e))?;
            children.push(entry.path());
        }

        for child in children {
            let Some(name) = child.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let dest = device_dir.join(name);
            if child.is_dir() {
                if !self.item_exists(device_dir, name) {
                    gio(&["mkdir", &dest.to_string_lossy()])?;
                }
                self.copy_folder_to_device(&child, &dest)?;
            } else {
                gio(&[
                    "copy",
                    "--backup=none",
                    &child.to_string_lossy(),
                    &dest.to_string_lossy(),
                ])?;
            }
        }
        Ok(())
    }
}

impl FileOps for MediaTransport {
    fn list_dir(&self, path: &DevicePath) -> Result<Vec<Entry>> {
        let dir = match self.resolve_existing(path) {
            Ok(dir) => dir,
            Err(Error::NotFound { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let entries = gio_list(&dir)?;
        Ok(entries
            .into_iter()
            .map(|e| Entry {
                name: e.name,
                is_dir: e.is_dir,
            })
            .collect())
    }

    fn pull_file(&self, path: &DevicePath, name: &str, local_dest: &Path) -> Result<()> {
        let dir = self.resolve_existing(path)?;
        let src = dir.join(name);
        if self.dry_run {
            info!(
                "dry-run: would pull {}/{} to {}",
                path,
                name,
                local_dest.display()
            );
            return Ok(());
        }
        if let Some(parent) = local_dest.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        gio(&["copy", &src.to_string_lossy(), &local_dest.to_string_lossy()])?;
        Ok(())
    }

    fn push_file(&self, path: &DevicePath, local_file: &Path) -> Result<()> {
        let name = local_file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::NotFound {
                path: local_file.display().to_string(),
            })?;
        if self.dry_run {
            info!("dry-run: would push {} to {}/{}", local_file.display(), path, name);
            return Ok(());
        }
        let dir = self.resolve_creating(path)?;
        let dest = dir.join(name);
        gio(&[
            "copy",
            "--backup=none",
            &local_file.to_string_lossy(),
            &dest.to_string_lossy(),
        ])?;
        Ok(())
    }

    fn pull_folder(&self, path: &DevicePath, local_dest: &Path) -> Result<()> {
        let dir = self.resolve_existing(path)?;
        if self.dry_run {
            info!(
                "dry-run: would pull folder {} to {}",
                path,
                local_dest.display()
            );
            return Ok(());
        }
        if local_dest.exists() {
            fs::remove_dir_all(local_dest).map_err(|e| Error::io(local_dest, e))?;
        }
        self.copy_folder_from_device(&dir, local_dest)
    }

    fn push_folder(&self, path: &DevicePath, local_dir: &Path) -> Result<()> {
        if self.dry_run {
            info!(
                "dry-run: would push folder {} to {}",
                local_dir.display(),
                path
            );
            return Ok(());
        }
        let dir = self.resolve_creating(path)?;
        self.copy_folder_to_device(local_dir, &dir)
    }

    fn delete_item(&self, path: &DevicePath, name: &str) -> Result<()> {
        let dir = self.resolve_existing(path)?;
        if self.dry_run {
            info!("dry-run: would delete {}/{}", path, name);
            return Ok(());
        }

        // No direct delete primitive over MTP: move the item into a scratch
        // location, discard the scratch entry, then poll until the move is
        // observed to complete.
        let scratch = self.mount.join(SCRATCH_DIR);
        if !self.item_exists(&self.mount, SCRATCH_DIR) {
            gio(&["mkdir", &scratch.to_string_lossy()])?;
        }
        let discard = scratch.join(format!("{}-{}", Utc::now().timestamp(), name));
        let src = dir.join(name);
        gio(&["move", &src.to_string_lossy(), &discard.to_string_lossy()])?;
        if let Err(e) = gio(&["remove", "-f", &discard.to_string_lossy()]) {
            debug!("scratch discard left behind: {e}");
        }

        let deadline = std::time::Instant::now() + Duration::from_secs(DELETE_TIMEOUT_SECS);
        while self.item_exists(&dir, name) {
            if std::time::Instant::now() >= deadline {
                return Err(Error::Timeout {
                    operation: format!("delete of {}/{}", path, name),
                    seconds: DELETE_TIMEOUT_SECS,
                });
            }
            thread::sleep(Duration::from_millis(DELETE_POLL_MS));
        }
        Ok(())
    }

    fn modified_at(&self, path: &DevicePath, name: &str) -> Result<Option<DateTime<Utc>>> {
        let dir = self.resolve_existing(path)?;
        let output = gio_list_raw(&dir)?;
        for line in output.lines() {
            let mut fields = line.split('\t');
            if fields.next() != Some(name) {
                continue;
            }
            let mtime = parse_listing_mtime(line);
            if mtime.is_none() {
                warn!(item = %name, line = %line, "no plausible mtime column");
            }
            return Ok(mtime);
        }
        Ok(None)
    }
}

/// One raw listing entry.
#[derive(Debug, Clone)]
struct RawEntry {
    name: String,
    is_dir: bool,
}

/// Run `gio <args...>`, capturing stdout.
fn gio(args: &[&str]) -> Result<String> {
    let rendered = format!("gio {}", args.join(" "));
    debug!(command = %rendered, "running gio");

    let output = Command::new("gio")
        .args(args)
        .output()
        .map_err(|e| Error::command(&rendered, e.to_string()))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(Error::command(rendered, stderr.trim().to_string()))
    }
}

fn gio_list_raw(dir: &Path) -> Result<String> {
    gio(&[
        "list",
        "-l",
        "-a",
        "standard::name,time::modified",
        &dir.to_string_lossy(),
    ])
}

fn gio_list(dir: &Path) -> Result<Vec<RawEntry>> {
    let output = gio_list_raw(dir)?;
    Ok(output.lines().filter_map(parse_listing_entry).collect())
}

fn parse_listing_entry(line: &str) -> Option<RawEntry> {
    let mut fields = line.split('\t');
    let name = fields.next()?.trim();
    if name.is_empty() {
        return None;
    }
    let is_dir = line.contains("(directory)");
    Some(RawEntry {
        name: name.to_string(),
        is_dir,
    })
}

/// Probe listing columns for a modification time.
///
/// Which column carries the timestamp varies by device, so a small set of
/// candidate indices is tried; the first value parsing as a date with a year
/// past 2000 is accepted.
fn parse_listing_mtime(line: &str) -> Option<DateTime<Utc>> {
    let fields: Vec<&str> = line.split('\t').collect();
    for &idx in MTIME_COLUMN_CANDIDATES {
        let Some(field) = fields.get(idx) else {
            continue;
        };
        // Attribute output renders as `time::modified=<value>`.
        let value = field.rsplit('=').next().unwrap_or(field).trim();
        if let Some(ts) = parse_plausible_date(value) {
            return Some(ts);
        }
    }
    None
}

fn parse_plausible_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(epoch) = value.parse::<i64>() {
        if epoch >= PLAUSIBLE_EPOCH_FLOOR {
            return DateTime::from_timestamp(epoch, 0);
        }
        return None;
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        && dt.year() > 2000
    {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        && d.year() > 2000
    {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_listing_entry() {
        let entry = parse_listing_entry("Farm1\t4096\t(directory)").unwrap();
        assert_eq!(entry.name, "Farm1");
        assert!(entry.is_dir);

        let entry = parse_listing_entry("SaveGameInfo\t1822\t(regular)").unwrap();
        assert!(!entry.is_dir);
    }

    #[test]
    fn test_parse_listing_entry_name_with_spaces() {
        let entry = parse_listing_entry("Internal shared storage\t0\t(directory)").unwrap();
        assert_eq!(entry.name, "Internal shared storage");
    }

    #[test]
    fn test_mtime_from_attribute_column() {
        let line = "Farm1\t4096\t(directory)\ttime::modified=1724880000";
        let ts = parse_listing_mtime(line).unwrap();
        assert_eq!(ts, Utc.timestamp_opt(1_724_880_000, 0).unwrap());
    }

    #[test]
    fn test_mtime_probes_alternate_column() {
        // Some devices put the date where the size usually is.
        let line = "Farm1\t0\t2024-08-28 12:30:00\t(directory)";
        let ts = parse_listing_mtime(line).unwrap();
        assert_eq!(ts.year(), 2024);
    }

    #[test]
    fn test_mtime_rejects_implausible_values() {
        // Small integers (sizes, counts) must not be mistaken for epochs.
        assert!(parse_listing_mtime("Farm1\t4096\t(directory)").is_none());
        assert!(parse_plausible_date("1822").is_none());
        assert!(parse_plausible_date("1999-12-31").is_none());
    }

    #[test]
    fn test_plausible_epoch_boundary() {
        assert!(parse_plausible_date("946684800").is_some());
        assert!(parse_plausible_date("946684799").is_none());
    }
}
