//! State store error types.

use std::path::PathBuf;

/// Errors that can occur while persisting state files.
#[derive(thiserror::Error, Debug)]
pub enum StateError {
    /// Failed to read or write a state file.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State file contents are not valid JSON for the expected shape.
    #[error("Invalid state file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
