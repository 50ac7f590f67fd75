//! Device-control actions
//!
//! Thin operations over the transport's command channel: launching the game,
//! pulling logs, and managing the game/loader APK. Commands that need the
//! shell fail cleanly on a shell-less media transport; log retrieval works on
//! any transport since it is a plain file pull.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use farmlink_transport::{DevicePath, FileOps, SHELL_DATA_ROOT, Transport};
use tracing::{debug, info};

use crate::config::RunContext;
use crate::error::Result;

/// Android package id of the game.
pub const GAME_PACKAGE: &str = "com.chucklefish.stardewvalley";

/// Current SMAPI log file name under `ErrorLogs/`.
pub const SMAPI_LOG_FILE: &str = "SMAPI-latest.txt";

/// Delay between launching the game and sending the profile tap, giving the
/// splash screen time to appear.
const TAP_DELAY_SECS: u64 = 10;

const INSTALL_POLL_TIMEOUT_SECS: u64 = 120;
const INSTALL_POLL_INTERVAL_SECS: u64 = 2;

const MISSING_MARKER: &str = "No such file or directory";

/// Installed-state of the game package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApkStatus {
    /// On-device path of the installed APK, when installed.
    pub apk_path: Option<String>,
    pub version: Option<String>,
}

impl ApkStatus {
    pub fn installed(&self) -> bool {
        self.apk_path.is_some()
    }
}

/// Device-control operations over one live transport.
pub struct DeviceActions<'a> {
    transport: &'a Transport,
    ctx: RunContext,
}

impl<'a> DeviceActions<'a> {
    pub fn new(transport: &'a Transport, ctx: RunContext) -> Self {
        Self { transport, ctx }
    }

    fn shell(&self) -> Result<&'a farmlink_transport::AdbShell> {
        self.transport
            .shell()
            .ok_or(farmlink_transport::Error::NoCommandChannel)
            .map_err(Into::into)
    }

    /// Pull the current SMAPI log into `dest_dir`, returning the local path.
    pub fn pull_log(&self, dest_dir: &Path) -> Result<PathBuf> {
        let dest = dest_dir.join(SMAPI_LOG_FILE);
        self.transport
            .pull_file(&DevicePath::error_logs(), SMAPI_LOG_FILE, &dest)?;
        Ok(dest)
    }

    /// Force-stop and relaunch the game; optionally send a screen tap after
    /// the splash delay to select the configured farm.
    pub fn launch(&self, tap: Option<(u32, u32)>) -> Result<()> {
        let shell = self.shell()?;
        if self.ctx.dry_run {
            info!("dry-run: would relaunch {GAME_PACKAGE}");
            return Ok(());
        }

        shell.shell(&format!("am force-stop {GAME_PACKAGE}"))?;
        shell.shell(&format!(
            "monkey -p {GAME_PACKAGE} -c android.intent.category.LAUNCHER 1"
        ))?;
        info!("launched {GAME_PACKAGE}");

        if let Some((x, y)) = tap {
            thread::sleep(Duration::from_secs(TAP_DELAY_SECS));
            shell.shell(&format!("input tap {x} {y}"))?;
            debug!("sent profile tap at ({x}, {y})");
        }
        Ok(())
    }

    /// Query whether the game package is installed, with its APK path and
    /// version when available.
    pub fn apk_status(&self) -> Result<ApkStatus> {
        let shell = self.shell()?;
        let path_out = shell.shell(&format!("pm path {GAME_PACKAGE}"))?;
        let apk_path = parse_pm_path(&path_out);

        let version = if apk_path.is_some() {
            let dump = shell.shell(&format!("dumpsys package {GAME_PACKAGE}"))?;
            parse_version_name(&dump)
        } else {
            None
        };

        Ok(ApkStatus { apk_path, version })
    }

    /// Pull the installed game APK into `dest_dir`.
    pub fn apk_pull(&self, dest_dir: &Path) -> Result<PathBuf> {
        let shell = self.shell()?;
        let status = self.apk_status()?;
        let Some(remote) = status.apk_path else {
            return Err(farmlink_transport::Error::NotFound {
                path: format!("package {GAME_PACKAGE}"),
            }
            .into());
        };

        let dest = dest_dir.join(format!("{GAME_PACKAGE}.apk"));
        if self.ctx.dry_run {
            info!("dry-run: would pull {remote} to {}", dest.display());
            return Ok(dest);
        }
        shell.pull(&remote, &dest)?;
        info!("pulled APK to {}", dest.display());
        Ok(dest)
    }

    /// Install (or reinstall) an APK from the local filesystem.
    pub fn apk_install(&self, apk: &Path) -> Result<()> {
        let shell = self.shell()?;
        if self.ctx.dry_run {
            info!("dry-run: would install {}", apk.display());
            return Ok(());
        }
        let apk_str = apk.to_string_lossy();
        shell.run(&["install", "-r", apk_str.as_ref()])?;
        info!("installed {}", apk.display());
        Ok(())
    }

    /// Install the SMAPI loader APK, then wait for the application-data root
    /// to appear; the loader creates it on first launch setup.
    pub fn smapi_install(&self, apk: &Path) -> Result<()> {
        self.apk_install(apk)?;
        if self.ctx.dry_run {
            return Ok(());
        }

        let shell = self.shell()?;
        info!("waiting for {SHELL_DATA_ROOT} to appear");
        let deadline = Instant::now() + Duration::from_secs(INSTALL_POLL_TIMEOUT_SECS);
        loop {
            let out = shell.shell(&format!("ls -d {SHELL_DATA_ROOT}"))?;
            if !out.contains(MISSING_MARKER) && out.contains(SHELL_DATA_ROOT) {
                info!("application data root is present");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(farmlink_transport::Error::Timeout {
                    operation: format!("{SHELL_DATA_ROOT} to appear"),
                    seconds: INSTALL_POLL_TIMEOUT_SECS,
                }
                .into());
            }
            thread::sleep(Duration::from_secs(INSTALL_POLL_INTERVAL_SECS));
        }
    }
}

/// Parse the APK path out of `pm path` output (`package:/data/app/.../base.apk`).
fn parse_pm_path(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("package:"))
        .map(str::to_string)
}

/// Parse `versionName=` out of `dumpsys package` output.
fn parse_version_name(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("versionName="))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pm_path() {
        let out = "package:/data/app/~~abc==/com.chucklefish.stardewvalley-xyz==/base.apk\n";
        assert_eq!(
            parse_pm_path(out).unwrap(),
            "/data/app/~~abc==/com.chucklefish.stardewvalley-xyz==/base.apk"
        );
    }

    #[test]
    fn test_parse_pm_path_not_installed() {
        assert_eq!(parse_pm_path(""), None);
        assert_eq!(parse_pm_path("\n"), None);
    }

    #[test]
    fn test_parse_version_name() {
        let out = "    pkg=Package{abc com.chucklefish.stardewvalley}\n\
                   \x20   versionCode=148 minSdk=21\n\
                   \x20   versionName=1.6.15.2\n";
        assert_eq!(parse_version_name(out).unwrap(), "1.6.15.2");
        assert_eq!(parse_version_name("no version here"), None);
    }

    #[test]
    fn test_apk_status_installed_flag() {
        let installed = ApkStatus {
            apk_path: Some("/data/app/base.apk".to_string()),
            version: Some("1.6".to_string()),
        };
        assert!(installed.installed());

        let absent = ApkStatus {
            apk_path: None,
            version: None,
        };
        assert!(!absent.installed());
    }
}
