//! The uniform transport contract
//!
//! Exactly one [`Transport`] exists per invocation, produced by detection.
//! The two variants carry only the handles valid for their kind; capability
//! queries are exhaustive matches rather than nullable-field probing.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::direct::DirectTransport;
use crate::error::Result;
use crate::media::MediaTransport;
use crate::path::DevicePath;
use crate::shell::AdbShell;

/// Which kind of transport is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// adb shell with direct file access.
    Direct,
    /// Portable-device file-copy interface (MTP).
    MediaCopy,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Direct => write!(f, "direct"),
            TransportKind::MediaCopy => write!(f, "media-copy"),
        }
    }
}

/// One entry of a device directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
}

/// Uniform file operations over the device.
///
/// Listing a non-existent path yields an empty list, never an error. Mutating
/// operations honor the dry-run flag fixed at transport construction: they
/// log the intended action and report success without touching the device.
pub trait FileOps {
    /// List the children of a device directory.
    fn list_dir(&self, path: &DevicePath) -> Result<Vec<Entry>>;

    /// Copy one device file into `local_dest`, creating local parents.
    fn pull_file(&self, path: &DevicePath, name: &str, local_dest: &Path) -> Result<()>;

    /// Copy one local file into the device directory `path`; the device-side
    /// name is taken from the local file name.
    fn push_file(&self, path: &DevicePath, local_file: &Path) -> Result<()>;

    /// Recursively copy a device folder to `local_dest`.
    fn pull_folder(&self, path: &DevicePath, local_dest: &Path) -> Result<()>;

    /// Recursively copy a local folder to the device path.
    fn push_folder(&self, path: &DevicePath, local_dir: &Path) -> Result<()>;

    /// Delete one named item under a device directory.
    fn delete_item(&self, path: &DevicePath, name: &str) -> Result<()>;

    /// Best-effort modification time of one named item.
    fn modified_at(&self, path: &DevicePath, name: &str) -> Result<Option<DateTime<Utc>>>;
}

/// The single live transport handle for this invocation.
pub enum Transport {
    Direct(DirectTransport),
    MediaCopy(MediaTransport),
}

impl Transport {
    pub fn kind(&self) -> TransportKind {
        match self {
            Transport::Direct(_) => TransportKind::Direct,
            Transport::MediaCopy(_) => TransportKind::MediaCopy,
        }
    }

    /// Stable device identity key.
    pub fn identity(&self) -> &str {
        match self {
            Transport::Direct(t) => t.identity(),
            Transport::MediaCopy(t) => t.identity(),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Transport::Direct(t) => t.display_name(),
            Transport::MediaCopy(t) => t.display_name(),
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Transport::Direct(t) => t.model(),
            Transport::MediaCopy(t) => t.model(),
        }
    }

    /// Whether device-control commands can be executed.
    pub fn can_execute_commands(&self) -> bool {
        match self {
            Transport::Direct(_) => true,
            Transport::MediaCopy(t) => t.shell().is_some(),
        }
    }

    /// Whether file operations go through the shell channel directly.
    /// True only for a direct transport whose data root was readable.
    pub fn can_access_files_directly(&self) -> bool {
        match self {
            Transport::Direct(t) => t.files_direct(),
            Transport::MediaCopy(_) => false,
        }
    }

    /// The command channel, when one exists.
    pub fn shell(&self) -> Option<&AdbShell> {
        match self {
            Transport::Direct(t) => Some(t.shell()),
            Transport::MediaCopy(t) => t.shell(),
        }
    }
}

impl FileOps for Transport {
    fn list_dir(&self, path: &DevicePath) -> Result<Vec<Entry>> {
        match self {
            Transport::Direct(t) => t.list_dir(path),
            Transport::MediaCopy(t) => t.list_dir(path),
        }
    }

    fn pull_file(&self, path: &DevicePath, name: &str, local_dest: &Path) -> Result<()> {
        match self {
            Transport::Direct(t) => t.pull_file(path, name, local_dest),
            Transport::MediaCopy(t) => t.pull_file(path, name, local_dest),
        }
    }

    fn push_file(&self, path: &DevicePath, local_file: &Path) -> Result<()> {
        match self {
            Transport::Direct(t) => t.push_file(path, local_file),
            Transport::MediaCopy(t) => t.push_file(path, local_file),
        }
    }

    fn pull_folder(&self, path: &DevicePath, local_dest: &Path) -> Result<()> {
        match self {
            Transport::Direct(t) => t.pull_folder(path, local_dest),
            Transport::MediaCopy(t) => t.pull_folder(path, local_dest),
        }
    }

    fn push_folder(&self, path: &DevicePath, local_dir: &Path) -> Result<()> {
        match self {
            Transport::Direct(t) => t.push_folder(path, local_dir),
            Transport::MediaCopy(t) => t.push_folder(path, local_dir),
        }
    }

    fn delete_item(&self, path: &DevicePath, name: &str) -> Result<()> {
        match self {
            Transport::Direct(t) => t.delete_item(path, name),
            Transport::MediaCopy(t) => t.delete_item(path, name),
        }
    }

    fn modified_at(&self, path: &DevicePath, name: &str) -> Result<Option<DateTime<Utc>>> {
        match self {
            Transport::Direct(t) => t.modified_at(path, name),
            Transport::MediaCopy(t) => t.modified_at(path, name),
        }
    }
}
