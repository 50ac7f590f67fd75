//! farmlink-transport: device transports for FarmLink
//!
//! One uniform file-operation contract ([`FileOps`]) over two transport
//! kinds with very different capability profiles:
//!
//! - [`DirectTransport`]: adb shell with direct file access.
//! - [`MediaTransport`]: the desktop's portable-device (MTP) copy interface,
//!   used when device storage restrictions block shell file access.
//!
//! [`detect`] probes the environment and produces exactly one live
//! [`Transport`] per invocation, or none.

pub mod detect;
pub mod direct;
pub mod error;
pub mod media;
pub mod path;
pub mod shell;
pub mod transport;

pub use detect::{DetectorProbes, MediaCandidate, SystemProbes, detect, detect_with};
pub use direct::DirectTransport;
pub use error::{Error, Result};
pub use media::MediaTransport;
pub use path::{DevicePath, MODS_DIR, SAVES_DIR, SHELL_DATA_ROOT};
pub use shell::{AdbDeviceInfo, AdbShell};
pub use transport::{Entry, FileOps, Transport, TransportKind};
