//! Direct (adb) transport
//!
//! File operations ride the adb shell and `adb push`/`adb pull`. Fastest
//! transport; requires the device to expose the data root to the shell user.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::path::DevicePath;
use crate::shell::{AdbShell, DENIED_MARKER, MISSING_MARKER};
use crate::transport::{Entry, FileOps};

/// Transport over an adb connection with direct file access.
pub struct DirectTransport {
    shell: AdbShell,
    display_name: String,
    model: String,
    /// False when detection fell through to shell-only mode: commands work,
    /// file operations fail per call instead of blocking the whole run.
    files_direct: bool,
    dry_run: bool,
}

impl DirectTransport {
    pub fn new(
        shell: AdbShell,
        model: impl Into<String>,
        files_direct: bool,
        dry_run: bool,
    ) -> Self {
        let model = model.into();
        let display_name = if model == "unknown" {
            shell.serial().to_string()
        } else {
            model.clone()
        };
        Self {
            shell,
            display_name,
            model,
            files_direct,
            dry_run,
        }
    }

    pub fn identity(&self) -> &str {
        self.shell.serial()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn shell(&self) -> &AdbShell {
        &self.shell
    }

    pub fn files_direct(&self) -> bool {
        self.files_direct
    }

    fn require_file_access(&self, path: &DevicePath) -> Result<()> {
        if self.files_direct {
            Ok(())
        } else {
            Err(Error::AccessDenied {
                path: path.shell_path(),
            })
        }
    }
}

impl FileOps for DirectTransport {
    fn list_dir(&self, path: &DevicePath) -> Result<Vec<Entry>> {
        self.require_file_access(path)?;
        let shell_path = path.shell_path();
        let output = self.shell.shell(&format!("ls -p '{}'", shell_path))?;

        if output.contains(MISSING_MARKER) {
            return Ok(Vec::new());
        }
        if output.contains(DENIED_MARKER) {
            return Err(Error::AccessDenied { path: shell_path });
        }

        Ok(parse_ls_output(&output))
    }

    fn pull_file(&self, path: &DevicePath, name: &str, local_dest: &Path) -> Result<()> {
        self.require_file_access(path)?;
        let remote = format!("{}/{}", path.shell_path(), name);
        if self.dry_run {
            info!("dry-run: would pull {} to {}", remote, local_dest.display());
            return Ok(());
        }
        if let Some(parent) = local_dest.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        self.shell.pull(&remote, local_dest)
    }

    fn push_file(&self, path: &DevicePath, local_file: &Path) -> Result<()> {
        self.require_file_access(path)?;
        let name = local_file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::NotFound {
                path: local_file.display().to_string(),
            })?;
        let dir = path.shell_path();
        let remote = format!("{}/{}", dir, name);
        if self.dry_run {
            info!("dry-run: would push {} to {}", local_file.display(), remote);
            return Ok(());
        }
        self.shell.shell(&format!("mkdir -p '{}'", dir))?;
        self.shell.push(local_file, &remote)
    }

    fn pull_folder(&self, path: &DevicePath, local_dest: &Path) -> Result<()> {
        self.require_file_access(path)?;
        let remote = path.shell_path();
        if self.dry_run {
            info!(
                "dry-run: would pull folder {} to {}",
                remote,
                local_dest.display()
            );
            return Ok(());
        }
        // adb pull nests the source under an existing destination directory,
        // so the destination must not exist beforehand.
        if local_dest.exists() {
            fs::remove_dir_all(local_dest).map_err(|e| Error::io(local_dest, e))?;
        }
        if let Some(parent) = local_dest.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        self.shell.pull(&remote, local_dest)
    }

    fn push_folder(&self, path: &DevicePath, local_dir: &Path) -> Result<()> {
        self.require_file_access(path)?;
        let remote = path.shell_path();
        if self.dry_run {
            info!(
                "dry-run: would push folder {} to {}",
                local_dir.display(),
                remote
            );
            return Ok(());
        }
        // Same nesting hazard as pull: pushing onto an existing directory
        // lands the source one level deeper than intended. Clear it first.
        self.shell.shell(&format!("rm -rf '{}'", remote))?;
        if let Some((parent, _)) = remote.rsplit_once('/') {
            self.shell.shell(&format!("mkdir -p '{}'", parent))?;
        }
        self.shell.push(local_dir, &remote)
    }

    fn delete_item(&self, path: &DevicePath, name: &str) -> Result<()> {
        self.require_file_access(path)?;
        let remote = format!("{}/{}", path.shell_path(), name);
        if self.dry_run {
            info!("dry-run: would delete {}", remote);
            return Ok(());
        }
        self.shell.shell(&format!("rm -rf '{}'", remote))?;
        Ok(())
    }

    fn modified_at(&self, path: &DevicePath, name: &str) -> Result<Option<DateTime<Utc>>> {
        self.require_file_access(path)?;
        let remote = format!("{}/{}", path.shell_path(), name);
        let output = self.shell.shell(&format!("stat -c %Y '{}'", remote))?;
        let trimmed = output.trim();

        if trimmed.contains(MISSING_MARKER) || trimmed.contains(DENIED_MARKER) {
            return Ok(None);
        }

        match trimmed.parse::<i64>() {
            Ok(epoch) => {
                debug!(path = %remote, epoch, "stat mtime");
                Ok(DateTime::from_timestamp(epoch, 0))
            }
            Err(_) => {
                warn!(path = %remote, output = %trimmed, "unparseable stat output");
                Ok(None)
            }
        }
    }
}

fn parse_ls_output(output: &str) -> Vec<Entry> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.strip_suffix('/') {
            Some(name) => Entry {
                name: name.to_string(),
                is_dir: true,
            },
            None => Entry {
                name: line.to_string(),
                is_dir: false,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ls_output() {
        let out = "Farm1/\nFarm2/\nsteam_autocloud.vdf\n";
        let entries = parse_ls_output(out);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "Farm1");
        assert!(entries[0].is_dir);
        assert_eq!(entries[2].name, "steam_autocloud.vdf");
        assert!(!entries[2].is_dir);
    }

    #[test]
    fn test_parse_ls_output_empty() {
        assert!(parse_ls_output("\n").is_empty());
    }

    #[test]
    fn test_shell_only_transport_rejects_file_ops() {
        let t = DirectTransport::new(AdbShell::new("serial"), "Pixel", false, false);
        let result = t.list_dir(&DevicePath::saves());
        assert!(matches!(result, Err(Error::AccessDenied { .. })));
    }
}
