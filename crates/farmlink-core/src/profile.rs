//! Device profile store
//!
//! Per-device metadata keyed by device identity, persisted as a JSON object
//! in `devices.json`. Populated on every successful transport detection and
//! consumed by device-control actions (the launch tap coordinates live
//! here). Profiles are never deleted automatically.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use farmlink_transport::Transport;

/// Stored metadata for one device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Human-readable device name.
    pub name: String,
    /// Device model.
    pub model: String,
    /// Transport kind last used for this device.
    pub transport: String,
    /// Screen coordinates tapped after launch, when the device needs it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tap: Option<(u32, u32)>,
    /// Last successful detection.
    pub last_seen: DateTime<Utc>,
}

/// JSON-backed store of device profiles keyed by identity.
pub struct ProfileStore {
    path: PathBuf,
    profiles: BTreeMap<String, DeviceProfile>,
}

impl ProfileStore {
    /// Load the store from `path`, starting empty when the file is absent.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let profiles = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, profiles })
    }

    /// Default store location under the user data directory.
    pub fn default_path(root: &Path) -> PathBuf {
        root.join("devices.json")
    }

    pub fn get(&self, identity: &str) -> Option<&DeviceProfile> {
        self.profiles.get(identity)
    }

    /// Create or refresh the profile for a freshly detected transport,
    /// preserving any stored tap coordinates.
    pub fn record_detection(&mut self, transport: &Transport) -> &DeviceProfile {
        let identity = transport.identity().to_string();
        let tap = self.profiles.get(&identity).and_then(|p| p.tap);
        debug!(identity = %identity, kind = %transport.kind(), "recording device profile");
        self.profiles.insert(
            identity.clone(),
            DeviceProfile {
                name: transport.display_name().to_string(),
                model: transport.model().to_string(),
                transport: transport.kind().to_string(),
                tap,
                last_seen: Utc::now(),
            },
        );
        &self.profiles[&identity]
    }

    /// Set the launch tap coordinates for a device.
    pub fn set_tap(&mut self, identity: &str, tap: Option<(u32, u32)>) {
        if let Some(profile) = self.profiles.get_mut(identity) {
            profile.tap = tap;
        }
    }

    /// Persist the store, creating the parent directory if needed.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.profiles)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DeviceProfile)> {
        self.profiles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_at(temp: &TempDir) -> ProfileStore {
        ProfileStore::load(temp.path().join("devices.json")).unwrap()
    }

    fn sample_profile() -> DeviceProfile {
        DeviceProfile {
            name: "SM A525F".to_string(),
            model: "SM_A525F".to_string(),
            transport: "direct".to_string(),
            tap: Some((540, 1200)),
            last_seen: Utc::now(),
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = store_at(&temp);
        assert!(store.get("R58M123ABC").is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let mut store = store_at(&temp);
        store
            .profiles
            .insert("R58M123ABC".to_string(), sample_profile());
        store.save().unwrap();

        let reloaded = store_at(&temp);
        let profile = reloaded.get("R58M123ABC").unwrap();
        assert_eq!(profile.model, "SM_A525F");
        assert_eq!(profile.tap, Some((540, 1200)));
    }

    #[test]
    fn test_document_is_object_keyed_by_identity() {
        let temp = TempDir::new().unwrap();
        let mut store = store_at(&temp);
        store
            .profiles
            .insert("R58M123ABC".to_string(), sample_profile());
        store.save().unwrap();

        let raw = fs::read_to_string(temp.path().join("devices.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.as_object().unwrap().contains_key("R58M123ABC"));
    }

    #[test]
    fn test_set_tap() {
        let temp = TempDir::new().unwrap();
        let mut store = store_at(&temp);
        store
            .profiles
            .insert("dev".to_string(), sample_profile());
        store.set_tap("dev", Some((100, 200)));
        assert_eq!(store.get("dev").unwrap().tap, Some((100, 200)));
    }
}
