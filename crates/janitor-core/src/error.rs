//! Error types for janitor-core

use std::path::PathBuf;

/// Result type for janitor-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in janitor-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration file not found at expected path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration loaded but cannot converge or escapes the tree
    #[error("Invalid configuration: {}", problems.join("; "))]
    ConfigInvalid { problems: Vec<String> },

    /// A repair step could not run at all
    #[error("Step {step} failed: {reason}")]
    StepFailed { step: String, reason: String },

    /// A host collaborator operation failed
    #[error("Host error: {message}")]
    Host { message: String },

    /// Structured object document is malformed
    #[error("Invalid object document {path}: {message}")]
    ObjectDocument { path: String, message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from janitor-fs
    #[error(transparent)]
    Fs(#[from] janitor_fs::Error),

    /// Content error from janitor-content
    #[error(transparent)]
    Content(#[from] janitor_content::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// Invalid file-name pattern
    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

impl Error {
    pub fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }
}
