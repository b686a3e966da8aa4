//! Byte offsets per log file, one JSON map per category.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::category::LogCategory;

use super::{read_json, write_json_atomic, StateError};

/// Offset to resume from given a stored offset and the current file size.
///
/// A file smaller than the stored offset was truncated or replaced, so
/// reading starts over from the beginning.
#[must_use]
pub fn effective_offset(stored: u64, file_size: u64) -> u64 {
    if file_size < stored {
        0
    } else {
        stored
    }
}

/// Persists `{file name -> byte offset}` maps in `<stem>_offsets.json`.
#[derive(Debug)]
pub struct OffsetStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl OffsetStore {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the offsets file for a category.
    #[must_use]
    pub fn path(&self, category: LogCategory) -> PathBuf {
        self.dir
            .join(format!("{}_offsets.json", category.state_stem()))
    }

    /// Load the offsets of a category.
    ///
    /// Returns an empty map when the file is absent or unreadable.
    #[must_use]
    pub fn get(&self, category: LogCategory) -> BTreeMap<String, u64> {
        load_map(&self.path(category))
    }

    /// Stored offset of a single file, 0 when unknown.
    #[must_use]
    pub fn offset_of(&self, category: LogCategory, file: &str) -> u64 {
        self.get(category).get(file).copied().unwrap_or(0)
    }

    /// Merge one file's offset into the persisted map.
    ///
    /// # Errors
    ///
    /// Returns an error if the map cannot be written.
    pub fn set(&self, category: LogCategory, file: &str, offset: u64) -> Result<(), StateError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let path = self.path(category);
        let mut map = load_map(&path);
        map.insert(file.to_string(), offset);
        write_json_atomic(&path, &map)?;
        tracing::trace!(%category, file, offset, "Offset persisted");
        Ok(())
    }
}

fn load_map(path: &Path) -> BTreeMap<String, u64> {
    match read_json(path) {
        Ok(map) => map.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable offsets file");
            BTreeMap::new()
        }
    }
}
