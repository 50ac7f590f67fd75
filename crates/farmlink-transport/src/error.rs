//! Error types for farmlink-transport

use std::path::PathBuf;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in transport operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },

    #[error("Access denied to device path {path}")]
    AccessDenied { path: String },

    #[error("Device path not found: {path}")]
    NotFound { path: String },

    #[error("Timed out after {seconds}s waiting for {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("No usable device transport was found")]
    TransportUnavailable,

    #[error("Transport has no command channel")]
    NoCommandChannel,
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn command(command: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            detail: detail.into(),
        }
    }
}
