//! Transport detection
//!
//! Produces exactly one [`Transport`] per invocation, following a fixed
//! priority order: direct file access always wins, and a working shell is
//! never silently dropped since device-control actions depend on it
//! independently of file transport.
//!
//! The environment probes sit behind [`DetectorProbes`] so the priority
//! matrix is testable without hardware.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::direct::DirectTransport;
use crate::media::MediaTransport;
use crate::path::{DevicePath, MEDIA_DATA_SEGMENTS};
use crate::shell::{self, AdbDeviceInfo, AdbShell, DENIED_MARKER, MISSING_MARKER};
use crate::transport::Transport;

/// A portable-device mount exposing the application-data root.
#[derive(Debug, Clone)]
pub struct MediaCandidate {
    pub mount: PathBuf,
    pub identity: String,
    pub model: String,
}

/// Environment probes consumed by detection.
pub trait DetectorProbes {
    /// The first connected adb device, if any.
    fn adb_device(&self) -> Option<AdbDeviceInfo>;

    /// Whether the shell can list the application-data root without a
    /// permission error.
    fn shell_can_list_root(&self, device: &AdbDeviceInfo) -> bool;

    /// A portable-device mount whose application-data root resolves.
    fn media_device(&self) -> Option<MediaCandidate>;
}

/// Detect the single live transport for this invocation.
pub fn detect(dry_run: bool) -> Option<Transport> {
    detect_with(&SystemProbes, dry_run)
}

/// Detection over explicit probes.
pub fn detect_with(probes: &dyn DetectorProbes, dry_run: bool) -> Option<Transport> {
    if let Some(device) = probes.adb_device() {
        let shell = AdbShell::new(&device.serial);

        if probes.shell_can_list_root(&device) {
            info!(serial = %device.serial, "detected direct transport");
            return Some(Transport::Direct(DirectTransport::new(
                shell,
                device.model,
                true,
                dry_run,
            )));
        }

        // Shell works but file access is blocked. Prefer the copy-based view
        // for files; commands keep routing through the shell.
        if let Some(media) = probes.media_device() {
            info!(identity = %media.identity, "detected media-copy transport (shell retained)");
            return Some(Transport::MediaCopy(MediaTransport::new(
                media.mount,
                media.identity,
                media.model,
                Some(shell),
                dry_run,
            )));
        }

        // Shell-only: file operations fail per call instead of blocking the
        // whole run.
        info!(serial = %device.serial, "detected shell-only direct transport");
        return Some(Transport::Direct(DirectTransport::new(
            shell,
            device.model,
            false,
            dry_run,
        )));
    }

    if let Some(media) = probes.media_device() {
        info!(identity = %media.identity, "detected media-copy transport (no shell)");
        return Some(Transport::MediaCopy(MediaTransport::new(
            media.mount,
            media.identity,
            media.model,
            None,
            dry_run,
        )));
    }

    debug!("no transport detected");
    None
}

/// Probes against the real environment: `adb` for the command channel, the
/// GVfs mount directory for portable devices.
pub struct SystemProbes;

impl DetectorProbes for SystemProbes {
    fn adb_device(&self) -> Option<AdbDeviceInfo> {
        shell::list_devices().into_iter().next()
    }

    fn shell_can_list_root(&self, device: &AdbDeviceInfo) -> bool {
        let shell = AdbShell::new(&device.serial);
        match shell.shell(&format!("ls '{}'", DevicePath::root().shell_path())) {
            Ok(output) => !output.contains(DENIED_MARKER) && !output.contains(MISSING_MARKER),
            Err(_) => false,
        }
    }

    fn media_device(&self) -> Option<MediaCandidate> {
        let gvfs = gvfs_dir()?;
        let entries = std::fs::read_dir(&gvfs).ok()?;

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with("mtp:") {
                continue;
            }
            let mount = entry.path();
            let mut data_root = mount.clone();
            for segment in MEDIA_DATA_SEGMENTS {
                data_root.push(segment);
            }
            if data_root.is_dir() {
                let model = name
                    .rsplit("host=")
                    .next()
                    .unwrap_or("portable device")
                    .replace('_', " ");
                return Some(MediaCandidate {
                    mount,
                    identity: name,
                    model,
                });
            }
        }
        None
    }
}

fn gvfs_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_RUNTIME_DIR").map(|dir| PathBuf::from(dir).join("gvfs"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportKind;

    struct Scripted {
        adb: Option<AdbDeviceInfo>,
        root_listable: bool,
        media: Option<MediaCandidate>,
    }

    impl DetectorProbes for Scripted {
        fn adb_device(&self) -> Option<AdbDeviceInfo> {
            self.adb.clone()
        }

        fn shell_can_list_root(&self, _device: &AdbDeviceInfo) -> bool {
            self.root_listable
        }

        fn media_device(&self) -> Option<MediaCandidate> {
            self.media.clone()
        }
    }

    fn adb() -> Option<AdbDeviceInfo> {
        Some(AdbDeviceInfo {
            serial: "R58M123ABC".to_string(),
            model: "SM_A525F".to_string(),
        })
    }

    fn media() -> Option<MediaCandidate> {
        Some(MediaCandidate {
            mount: PathBuf::from("/run/user/1000/gvfs/mtp:host=SAMSUNG"),
            identity: "mtp:host=SAMSUNG".to_string(),
            model: "SAMSUNG".to_string(),
        })
    }

    #[test]
    fn test_tier1_direct_with_full_access() {
        let probes = Scripted {
            adb: adb(),
            root_listable: true,
            media: media(),
        };
        let transport = detect_with(&probes, false).unwrap();
        assert_eq!(transport.kind(), TransportKind::Direct);
        assert!(transport.can_execute_commands());
        assert!(transport.can_access_files_directly());
    }

    #[test]
    fn test_tier2_media_copy_retains_shell() {
        let probes = Scripted {
            adb: adb(),
            root_listable: false,
            media: media(),
        };
        let transport = detect_with(&probes, false).unwrap();
        assert_eq!(transport.kind(), TransportKind::MediaCopy);
        assert!(transport.can_execute_commands());
        assert!(!transport.can_access_files_directly());
    }

    #[test]
    fn test_tier3_shell_only_direct() {
        let probes = Scripted {
            adb: adb(),
            root_listable: false,
            media: None,
        };
        let transport = detect_with(&probes, false).unwrap();
        assert_eq!(transport.kind(), TransportKind::Direct);
        assert!(transport.can_execute_commands());
        assert!(!transport.can_access_files_directly());
    }

    #[test]
    fn test_tier4_media_copy_without_shell() {
        let probes = Scripted {
            adb: None,
            root_listable: false,
            media: media(),
        };
        let transport = detect_with(&probes, false).unwrap();
        assert_eq!(transport.kind(), TransportKind::MediaCopy);
        assert!(!transport.can_execute_commands());
        assert!(!transport.can_access_files_directly());
    }

    #[test]
    fn test_tier5_nothing() {
        let probes = Scripted {
            adb: None,
            root_listable: false,
            media: None,
        };
        assert!(detect_with(&probes, false).is_none());
    }

    #[test]
    fn test_identity_is_stable_key() {
        let probes = Scripted {
            adb: adb(),
            root_listable: true,
            media: None,
        };
        let transport = detect_with(&probes, false).unwrap();
        assert_eq!(transport.identity(), "R58M123ABC");
    }
}
