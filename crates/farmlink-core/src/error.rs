//! Error types for farmlink-core

use std::path::PathBuf;

/// Result type for farmlink-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in farmlink-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Desktop configuration could not be parsed
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// A mod manifest was unreadable or invalid
    #[error("Invalid manifest at {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    /// Update-catalog query failed; aborts only the update-check step
    #[error("Update catalog query failed: {message}")]
    Catalog { message: String },

    /// One mod's install was abandoned; others continue
    #[error("Install failed for {name}: {message}")]
    Install { name: String, message: String },

    /// A download tier produced nothing usable
    #[error("No download source succeeded for {name}")]
    NoDownloadSource { name: String },

    // Transparent wrappers for underlying crate errors
    /// Transport error from farmlink-transport
    #[error(transparent)]
    Transport(#[from] farmlink_transport::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// HTTP error
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Archive extraction error
    #[error(transparent)]
    Archive(#[from] zip::result::ZipError),
}

impl Error {
    pub fn install(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Install {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }
}
