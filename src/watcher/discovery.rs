//! Log file discovery.
//!
//! Files are named `{category}_{YYYYMMDDHHMMSS}.log`, so sorting by name
//! gives chronological order.

use std::path::{Path, PathBuf};

use crate::category::LogCategory;

use super::error::WatcherError;

/// List every file of a category in `dir`, oldest first.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_category_files(dir: &Path, category: LogCategory) -> Result<Vec<PathBuf>, WatcherError> {
    if !dir.is_dir() {
        return Err(WatcherError::LogsDirUnavailable(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && category.matches_file(path))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Find the most recent file of a category.
///
/// Returns `None` if there is none or the directory cannot be read.
#[must_use]
pub fn find_latest_file(dir: &Path, category: LogCategory) -> Option<PathBuf> {
    list_category_files(dir, category).ok()?.pop()
}

/// File name as stored in the offsets map.
#[must_use]
pub fn file_key(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
