//! Watcher error types.

use std::path::PathBuf;

/// Errors that can occur while watching or tailing log files.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// Log file disappeared between the trigger and the read.
    #[error("Log file not found: {0}")]
    FileDeleted(PathBuf),

    /// Permission denied accessing a log file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The logs directory does not exist or is not a directory.
    #[error("Logs directory unavailable: {0}")]
    LogsDirUnavailable(PathBuf),

    /// Notify watcher error.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatcherError {
    /// Transient errors are retried on the next trigger without logging loudly.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::FileDeleted(_) | Self::Io(_))
    }
}
