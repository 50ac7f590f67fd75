//! Desktop configuration and run context

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::layout::LocalLayout;

/// Default tolerance window below which two timestamps count as equal.
pub const DEFAULT_TOLERANCE_SECS: i64 = 60;

/// Default number of backup generations retained per save.
pub const DEFAULT_BACKUP_RETENTION: usize = 5;

/// Desktop-side configuration, read from `config.toml` in the user config
/// directory. Every field is optional; a missing file yields defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Override for the local mirror root.
    pub local_root: Option<PathBuf>,
    /// Timestamp tolerance window, in seconds.
    pub tolerance_secs: i64,
    /// Backup generations retained per save.
    pub backup_retention: usize,
    /// Path to a file holding a Nexus Mods API key. The Nexus download tier
    /// is only attempted when this file exists.
    pub nexus_api_key_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            local_root: None,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            backup_retention: DEFAULT_BACKUP_RETENTION,
            nexus_api_key_file: None,
        }
    }
}

impl AppConfig {
    /// Load from the default config path, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path.clone(),
            message: e.to_string(),
        })
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("farmlink").join("config.toml"))
    }

    /// The local layout this configuration selects.
    pub fn layout(&self) -> LocalLayout {
        match &self.local_root {
            Some(root) => LocalLayout::new(root),
            None => LocalLayout::new(LocalLayout::default_root()),
        }
    }

    /// Default location of the Nexus API key file when none is configured.
    pub fn nexus_key_path(&self) -> Option<PathBuf> {
        self.nexus_api_key_file.clone().or_else(|| {
            dirs::config_dir().map(|d| d.join("farmlink").join("nexus_api_key"))
        })
    }
}

/// Immutable execution context threaded into every operation; never read
/// from ambient state.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunContext {
    /// Simulate: log intended actions, touch nothing.
    pub dry_run: bool,
    /// Skip confirmation prompts; newer side wins.
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.tolerance_secs, 60);
        assert_eq!(config.backup_retention, 5);
        assert!(config.local_root.is_none());
    }

    #[test]
    fn test_load_partial_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "tolerance_secs = 120\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.tolerance_secs, 120);
        assert_eq!(config.backup_retention, 5);
    }

    #[test]
    fn test_load_invalid_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "tolerance_secs = \"soon\"\n").unwrap();

        assert!(matches!(
            AppConfig::load_from(&path),
            Err(Error::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_layout_uses_override() {
        let config = AppConfig {
            local_root: Some(PathBuf::from("/tmp/mirror")),
            ..Default::default()
        };
        assert_eq!(config.layout().root(), PathBuf::from("/tmp/mirror"));
    }
}
