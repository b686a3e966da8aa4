//! Force-visibility workaround.
//!
//! Some filesystem backends only report changes to a file the game server
//! keeps open once something else touches the directory. Copying the latest
//! log to a hidden sibling and deleting it again produces that activity.
//! Off by default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::category::LogCategory;

use super::discovery::find_latest_file;

/// Path of the temporary copy for a log file.
#[must_use]
pub fn shadow_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.touch"))
}

/// Copy the latest file of a category to its shadow path and remove it.
///
/// # Errors
///
/// Returns an error if the copy or removal fails.
pub async fn touch_latest(dir: &Path, category: LogCategory) -> std::io::Result<bool> {
    let Some(latest) = find_latest_file(dir, category) else {
        return Ok(false);
    };
    let shadow = shadow_path(&latest);
    tokio::fs::copy(&latest, &shadow).await?;
    tokio::fs::remove_file(&shadow).await?;
    Ok(true)
}

pub(super) async fn force_visibility_loop(
    category: LogCategory,
    dir: PathBuf,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(interval) => {}
        }
        if let Err(e) = touch_latest(&dir, category).await {
            tracing::debug!(%category, error = %e, "Force-visibility touch failed");
        }
    }
}
