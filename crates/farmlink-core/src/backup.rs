//! Save backups with bounded rotation
//!
//! Before a pull overwrites a local save, its current contents are copied
//! into `backups/<name>/<stamp>/`. Stamps are sortable capture times, so
//! descending name order is descending capture order; everything past the
//! retention count is pruned, oldest first.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use crate::error::Result;

/// Stamp format: sorts lexicographically in capture order.
const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Snapshots local save folders and rotates retained generations.
pub struct BackupManager {
    saves_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl BackupManager {
    pub fn new(
        saves_dir: impl Into<PathBuf>,
        backups_dir: impl Into<PathBuf>,
        retention: usize,
    ) -> Self {
        Self {
            saves_dir: saves_dir.into(),
            backups_dir: backups_dir.into(),
            retention,
        }
    }

    /// Snapshot the current local copy of `name`, then prune old
    /// generations. No-op when the local folder does not exist.
    pub fn backup(&self, name: &str) -> Result<Option<PathBuf>> {
        let source = self.saves_dir.join(name);
        if !source.is_dir() {
            debug!(save = %name, "no local copy to back up");
            return Ok(None);
        }

        let stamp = Utc::now().format(STAMP_FORMAT).to_string();
        let dest = self.backups_dir.join(name).join(&stamp);
        copy_dir(&source, &dest)?;
        info!(save = %name, stamp = %stamp, "backed up save");

        self.rotate(name)?;
        Ok(Some(dest))
    }

    /// Delete every generation of `name` beyond the most recent
    /// `retention`.
    pub fn rotate(&self, name: &str) -> Result<()> {
        let item_dir = self.backups_dir.join(name);
        let mut stamps = Vec::new();
        if item_dir.is_dir() {
            for entry in fs::read_dir(&item_dir)? {
                let entry = entry?;
                if entry.path().is_dir()
                    && let Some(stamp) = entry.file_name().to_str()
                {
                    stamps.push(stamp.to_string());
                }
            }
        }

        // Stamps embed capture time, so name order is capture order.
        stamps.sort_by(|a, b| b.cmp(a));
        for stale in stamps.iter().skip(self.retention) {
            debug!(save = %name, stamp = %stale, "pruning backup generation");
            fs::remove_dir_all(item_dir.join(stale))?;
        }
        Ok(())
    }

    /// Retained generation stamps for `name`, newest first.
    pub fn generations(&self, name: &str) -> Result<Vec<String>> {
        let item_dir = self.backups_dir.join(name);
        let mut stamps = Vec::new();
        if item_dir.is_dir() {
            for entry in fs::read_dir(&item_dir)? {
                let entry = entry?;
                if entry.path().is_dir()
                    && let Some(stamp) = entry.file_name().to_str()
                {
                    stamps.push(stamp.to_string());
                }
            }
        }
        stamps.sort_by(|a, b| b.cmp(a));
        Ok(stamps)
    }
}

/// Recursive directory copy.
pub(crate) fn copy_dir(source: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let target = dest.join(entry.file_name());
        if path.is_dir() {
            copy_dir(&path, &target)?;
        } else {
            fs::copy(&path, &target)?;
        }
    }
    Ok(())
}
