//! farmlink-core: desktop-side sync logic for FarmLink
//!
//! Everything above the transport layer: the local mirror layout, desktop
//! configuration, device profiles, save backups, the bidirectional
//! reconciliation engine, mod manifest scanning, update checking, the tiered
//! mod installer, and device-control actions.

pub mod actions;
pub mod backup;
pub mod config;
pub mod error;
pub mod install;
pub mod layout;
pub mod manifest;
pub mod profile;
pub mod sync;
pub mod update;

pub use actions::{ApkStatus, DeviceActions, GAME_PACKAGE};
pub use backup::BackupManager;
pub use config::{AppConfig, RunContext};
pub use error::{Error, Result};
pub use install::{DownloadSource, InstallOutcome, ManualFetch, ModInstaller};
pub use layout::LocalLayout;
pub use manifest::{ModManifest, scan_manifests};
pub use profile::{DeviceProfile, ProfileStore};
pub use sync::{Confirmer, Decision, ReconciliationEngine, SyncCandidate, SyncReport, decide};
pub use update::{ModUpdate, UpdateChecker, UpdateHost};
