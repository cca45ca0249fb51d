//! Error types for the data-list core.
//!
//! Most failures in this crate are recovered locally (see the module docs of
//! [`preferences`](crate::preferences) and [`bridge`](crate::bridge)); these
//! errors only surface from calls a host makes explicitly.

use std::path::PathBuf;

/// Result type alias for data-list operations.
pub type Result<T> = std::result::Result<T, DataListError>;

/// Errors that can occur in the data-list core.
#[derive(Debug, thiserror::Error)]
pub enum DataListError {
    /// The persisted preferences slot holds something that is not a JSON object.
    #[error("Failed to decode preferences '{key}': {source}")]
    PreferencesDecode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Preferences could not be encoded for saving.
    #[error("Failed to encode preferences: {0}")]
    PreferencesEncode(#[source] serde_json::Error),

    /// Reading or writing the preferences file failed.
    #[error("Preferences I/O error at '{path}': {source}")]
    PreferencesIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No per-user configuration directory could be determined.
    #[error("No configuration directory available for '{0}'")]
    NoConfigDir(String),

    /// Host configuration could not be parsed.
    #[error("Invalid data-list configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The data-fetch collaborator reported a failure.
    #[error("Filter run failed: {0}")]
    Fetch(String),

    /// A required collaborator was not supplied to the builder.
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

impl DataListError {
    /// Create a preferences decode error.
    pub fn preferences_decode(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::PreferencesDecode {
            key: key.into(),
            source,
        }
    }

    /// Create a preferences I/O error.
    pub fn preferences_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PreferencesIo {
            path: path.into(),
            source,
        }
    }

    /// Create a fetch error.
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch(message.into())
    }
}
