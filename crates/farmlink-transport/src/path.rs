//! Logical device paths
//!
//! A [`DevicePath`] is an ordered list of path segments relative to the fixed
//! application-data root on the device. It is a pure value type: rendering to
//! a transport-native address happens here, actual lookups happen in the
//! transport implementations.

/// On-device application-data root, as seen by the adb shell.
pub const SHELL_DATA_ROOT: &str = "/storage/emulated/0/StardewValley";

/// Application-data root as exposed through the portable-device (MTP) view,
/// relative to the device mount point.
pub const MEDIA_DATA_SEGMENTS: &[&str] = &["Internal shared storage", "StardewValley"];

/// Name of the saves directory under the data root.
pub const SAVES_DIR: &str = "Saves";

/// Name of the mods directory under the data root.
pub const MODS_DIR: &str = "Mods";

/// An ordered sequence of path segments rooted at the device's
/// application-data directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DevicePath {
    segments: Vec<String>,
}

impl DevicePath {
    /// The application-data root itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// The save-games root (`Saves/`).
    pub fn saves() -> Self {
        Self::root().join(SAVES_DIR)
    }

    /// The mods root (`Mods/`).
    pub fn mods() -> Self {
        Self::root().join(MODS_DIR)
    }

    /// The SMAPI log file's parent directory.
    pub fn error_logs() -> Self {
        Self::root().join("ErrorLogs")
    }

    /// The internal SMAPI configuration directory.
    pub fn smapi_internal() -> Self {
        Self::root().join("smapi-internal")
    }

    /// Append one segment, returning a new path.
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// The path segments, in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Render as an absolute shell path for the command-capable transport.
    pub fn shell_path(&self) -> String {
        if self.segments.is_empty() {
            SHELL_DATA_ROOT.to_string()
        } else {
            format!("{}/{}", SHELL_DATA_ROOT, self.segments.join("/"))
        }
    }

    /// Segments to walk from a portable-device mount point, common root
    /// included.
    pub fn media_segments(&self) -> Vec<String> {
        MEDIA_DATA_SEGMENTS
            .iter()
            .map(|s| s.to_string())
            .chain(self.segments.iter().cloned())
            .collect()
    }
}

impl std::fmt::Display for DevicePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            write!(f, "<data root>")
        } else {
            write!(f, "{}", self.segments.join("/"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_shell_path() {
        assert_eq!(DevicePath::root().shell_path(), SHELL_DATA_ROOT);
    }

    #[test]
    fn test_join_shell_path() {
        let path = DevicePath::saves().join("Farm1");
        assert_eq!(
            path.shell_path(),
            "/storage/emulated/0/StardewValley/Saves/Farm1"
        );
    }

    #[test]
    fn test_media_segments_include_common_root() {
        let path = DevicePath::mods().join("ExampleMod");
        assert_eq!(
            path.media_segments(),
            vec![
                "Internal shared storage",
                "StardewValley",
                "Mods",
                "ExampleMod"
            ]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(DevicePath::root().to_string(), "<data root>");
        assert_eq!(DevicePath::saves().join("Farm1").to_string(), "Saves/Farm1");
    }
}
