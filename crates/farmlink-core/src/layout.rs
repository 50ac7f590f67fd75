//! Local mirror layout
//!
//! The desktop keeps a mirror of the device's data under one root:
//!
//! - `saves/` — one folder per save game
//! - `mods/` — one folder per mod (manifest plus optional config)
//! - `configs/` — per-mod config files mirroring mod names
//! - `backups/` — rolling save backups
//! - `downloads/` — scratch area for update downloads
//! - `downloads/manual/` — holding directory for the manual download tier
//! - `sync.log` — append-only, one line per sync run

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Typed accessors over the local mirror directory tree.
#[derive(Debug, Clone)]
pub struct LocalLayout {
    root: PathBuf,
}

impl LocalLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default mirror root under the user's data directory.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("farmlink")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn saves_dir(&self) -> PathBuf {
        self.root.join("saves")
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.root.join("mods")
    }

    pub fn configs_dir(&self) -> PathBuf {
        self.root.join("configs")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join("downloads")
    }

    /// Holding directory for manually downloaded archives.
    pub fn manual_downloads_dir(&self) -> PathBuf {
        self.downloads_dir().join("manual")
    }

    pub fn sync_log(&self) -> PathBuf {
        self.root.join("sync.log")
    }

    /// Create the full directory tree.
    pub fn ensure(&self) -> Result<()> {
        for dir in [
            self.saves_dir(),
            self.mods_dir(),
            self.configs_dir(),
            self.backups_dir(),
            self.manual_downloads_dir(),
        ] {
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    /// List the names of immediate subdirectories of `dir`.
    pub fn subdir_names(dir: &Path) -> Result<Vec<String>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.path().is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
