//! adb command channel
//!
//! [`AdbShell`] is a thin wrapper over the `adb` binary targeting a single
//! device by serial. It is the command channel for the direct transport and
//! for device-control actions; the media transport may also carry one when
//! shell access works but direct file access does not.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{Error, Result};

/// A connected adb device, as reported by `adb devices -l`.
#[derive(Debug, Clone)]
pub struct AdbDeviceInfo {
    /// Device serial number (stable identity key).
    pub serial: String,
    /// Device model, when reported.
    pub model: String,
}

/// Command channel to one adb device.
#[derive(Debug, Clone)]
pub struct AdbShell {
    serial: String,
}

impl AdbShell {
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
        }
    }

    /// The device serial this shell targets.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Run `adb -s <serial> <args...>`, capturing stdout.
    pub fn run(&self, args: &[&str]) -> Result<String> {
        let rendered = format!("adb -s {} {}", self.serial, args.join(" "));
        debug!(command = %rendered, "running adb");

        let output = Command::new("adb")
            .arg("-s")
            .arg(&self.serial)
            .args(args)
            .output()
            .map_err(|e| Error::command(&rendered, e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if output.status.success() {
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(Error::command(rendered, stderr.trim().to_string()))
        }
    }

    /// Run a command on the device shell, capturing stdout.
    ///
    /// adb's shell passthrough reports exit 0 even when the remote command
    /// fails, so remote errors surface in the captured output rather than the
    /// status code. Callers inspect the output for the failure markers they
    /// care about.
    pub fn shell(&self, command: &str) -> Result<String> {
        self.run(&["shell", command])
    }

    /// Copy one local file or directory to the device.
    pub fn push(&self, local: &Path, remote: &str) -> Result<()> {
        let local_str = local.to_string_lossy();
        self.run(&["push", local_str.as_ref(), remote])?;
        Ok(())
    }

    /// Copy one device file or directory to the local filesystem.
    pub fn pull(&self, remote: &str, local: &Path) -> Result<()> {
        let local_str = local.to_string_lossy();
        self.run(&["pull", remote, local_str.as_ref()])?;
        Ok(())
    }
}

/// Marker strings in shell output that mean the remote path was unreadable.
pub(crate) const DENIED_MARKER: &str = "Permission denied";
pub(crate) const MISSING_MARKER: &str = "No such file or directory";

/// List connected adb devices in the `device` state.
///
/// Returns an empty list when adb itself is unavailable; absence of the tool
/// is indistinguishable from absence of devices for detection purposes.
pub fn list_devices() -> Vec<AdbDeviceInfo> {
    let output = match Command::new("adb").args(["devices", "-l"]).output() {
        Ok(o) if o.status.success() => o,
        _ => return Vec::new(),
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_device_list(&stdout)
}

fn parse_device_list(stdout: &str) -> Vec<AdbDeviceInfo> {
    let mut devices = Vec::new();
    for line in stdout.lines().skip(1) {
        let mut fields = line.split_whitespace();
        let Some(serial) = fields.next() else {
            continue;
        };
        let Some(state) = fields.next() else {
            continue;
        };
        if state != "device" {
            continue;
        }
        let model = fields
            .find_map(|f| f.strip_prefix("model:"))
            .unwrap_or("unknown")
            .to_string();
        devices.push(AdbDeviceInfo {
            serial: serial.to_string(),
            model,
        });
    }
    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_list() {
        let out = "List of devices attached\n\
                   R58M123ABC\tdevice usb:1-1 product:a52 model:SM_A525F device:a52q\n\
                   emulator-5554\toffline\n";
        let devices = parse_device_list(out);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].serial, "R58M123ABC");
        assert_eq!(devices[0].model, "SM_A525F");
    }

    #[test]
    fn test_parse_device_list_no_model() {
        let out = "List of devices attached\nabcd1234\tdevice\n";
        let devices = parse_device_list(out);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].model, "unknown");
    }

    #[test]
    fn test_parse_device_list_empty() {
        let devices = parse_device_list("List of devices attached\n\n");
        assert!(devices.is_empty());
    }
}
