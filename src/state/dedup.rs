//! Processed event keys per category, with age-based eviction.
//!
//! Keys are opaque strings, but every key format used by the parsers embeds
//! the game timestamp (`YYYY.MM.DD-HH.MM.SS`) of the event. Eviction reads
//! that timestamp back out of the key.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;
use regex::Regex;

use crate::category::LogCategory;

use super::{read_json, write_json_atomic, StateError};

static GAME_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}\.\d{2}\.\d{2}-\d{2}\.\d{2}\.\d{2}").expect("valid timestamp regex")
});

static FILE_TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(\d{14})\.log").expect("valid file timestamp regex"));

/// Extract the event time embedded in a dedup key.
///
/// Looks for a game timestamp first, then for the `_YYYYMMDDHHMMSS.log`
/// suffix of a log file name.
#[must_use]
pub fn key_timestamp(key: &str) -> Option<NaiveDateTime> {
    if let Some(found) = GAME_TIMESTAMP.find(key) {
        if let Ok(ts) = NaiveDateTime::parse_from_str(found.as_str(), "%Y.%m.%d-%H.%M.%S") {
            return Some(ts);
        }
    }
    let caps = FILE_TIMESTAMP.captures(key)?;
    NaiveDateTime::parse_from_str(&caps[1], "%Y%m%d%H%M%S").ok()
}

/// Set of processed event keys, persisted as a JSON array per category.
#[derive(Debug)]
pub struct DedupStore {
    dir: PathBuf,
    sets: Mutex<HashMap<LogCategory, HashSet<String>>>,
}

impl DedupStore {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            sets: Mutex::new(HashMap::new()),
        }
    }

    /// Path of the processed events file for a category.
    #[must_use]
    pub fn path(&self, category: LogCategory) -> PathBuf {
        self.dir
            .join(format!("{}_processed_events.json", category.state_stem()))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<LogCategory, HashSet<String>>> {
        self.sets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn loaded<'a>(
        &self,
        sets: &'a mut HashMap<LogCategory, HashSet<String>>,
        category: LogCategory,
    ) -> &'a mut HashSet<String> {
        sets.entry(category).or_insert_with(|| {
            let path = self.path(category);
            match read_json::<Vec<String>>(&path) {
                Ok(keys) => keys.unwrap_or_default().into_iter().collect(),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring unreadable processed events file");
                    HashSet::new()
                }
            }
        })
    }

    fn persist(&self, category: LogCategory, keys: &HashSet<String>) -> Result<(), StateError> {
        let mut sorted: Vec<&String> = keys.iter().collect();
        sorted.sort();
        write_json_atomic(&self.path(category), &sorted)
    }

    /// Load a category's keys from disk, replacing anything cached.
    pub fn reload(&self, category: LogCategory) {
        let mut sets = self.lock();
        sets.remove(&category);
        let count = self.loaded(&mut sets, category).len();
        tracing::debug!(%category, count, "Processed events loaded");
    }

    /// Check whether an event was already delivered.
    #[must_use]
    pub fn has(&self, category: LogCategory, key: &str) -> bool {
        let mut sets = self.lock();
        self.loaded(&mut sets, category).contains(key)
    }

    /// Record an event as delivered and persist the set.
    ///
    /// # Errors
    ///
    /// Returns an error if the set cannot be written. The key stays recorded
    /// in memory either way.
    pub fn add(&self, category: LogCategory, key: &str) -> Result<(), StateError> {
        let mut sets = self.lock();
        let set = self.loaded(&mut sets, category);
        if set.insert(key.to_string()) {
            self.persist(category, set)?;
        }
        Ok(())
    }

    /// Number of keys held for a category.
    #[must_use]
    pub fn len(&self, category: LogCategory) -> usize {
        let mut sets = self.lock();
        self.loaded(&mut sets, category).len()
    }

    /// Drop keys whose embedded timestamp is older than `cutoff`.
    ///
    /// Keys without a parseable timestamp are dropped as well. Returns the
    /// number of evicted keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the pruned set cannot be written.
    pub fn evict_older_than(
        &self,
        category: LogCategory,
        cutoff: NaiveDateTime,
    ) -> Result<usize, StateError> {
        let mut sets = self.lock();
        let set = self.loaded(&mut sets, category);
        let before = set.len();
        set.retain(|key| key_timestamp(key).is_some_and(|ts| ts >= cutoff));
        let evicted = before - set.len();
        if evicted > 0 {
            self.persist(category, set)?;
            tracing::info!(%category, evicted, remaining = set.len(), "Evicted processed events");
        }
        Ok(evicted)
    }

    /// Evict using the category's retention relative to `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pruned set cannot be written.
    pub fn evict_expired(
        &self,
        category: LogCategory,
        now: NaiveDateTime,
    ) -> Result<usize, StateError> {
        self.evict_older_than(category, now - category.dedup_retention())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_key_timestamp_formats() {
        let chat = "2025.07.05-03.23.13|76561198140545020|oi";
        assert_eq!(
            key_timestamp(chat),
            NaiveDateTime::parse_from_str("2025.07.05 03:23:13", "%Y.%m.%d %H:%M:%S").ok()
        );

        let vehicle = "804481|2025.07.03-23.09.02|Disappeared";
        assert_eq!(key_timestamp(vehicle).unwrap().date(), NaiveDate::from_ymd_opt(2025, 7, 3).unwrap());

        let admin_no_stamp = "admin_20250705032313.log|Some line without a stamp";
        assert_eq!(key_timestamp(admin_no_stamp).unwrap(), at(2025, 7, 5, 3) + chrono::Duration::seconds(23 * 60 + 13));

        assert!(key_timestamp("garbage").is_none());
        assert!(key_timestamp("2025.13.45-99.99.99|x").is_none());
    }

    #[test]
    fn test_add_and_has() {
        let dir = TempDir::new().unwrap();
        let store = DedupStore::new(dir.path().to_path_buf());

        assert!(!store.has(LogCategory::Chat, "k1"));
        store.add(LogCategory::Chat, "k1").unwrap();
        assert!(store.has(LogCategory::Chat, "k1"));
        assert!(!store.has(LogCategory::Login, "k1"));
    }

    #[test]
    fn test_persists_as_json_array() {
        let dir = TempDir::new().unwrap();
        let store = DedupStore::new(dir.path().to_path_buf());
        store.add(LogCategory::Login, "b").unwrap();
        store.add(LogCategory::Login, "a").unwrap();

        let raw = std::fs::read_to_string(store.path(LogCategory::Login)).unwrap();
        let keys: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        let reopened = DedupStore::new(dir.path().to_path_buf());
        assert!(reopened.has(LogCategory::Login, "a"));
        assert_eq!(reopened.len(LogCategory::Login), 2);
    }

    #[test]
    fn test_eviction_by_cutoff() {
        let dir = TempDir::new().unwrap();
        let store = DedupStore::new(dir.path().to_path_buf());
        let old = "2025.07.01-10.00.00|1|Login";
        let fresh = "2025.07.05-10.00.00|1|Login";
        store.add(LogCategory::Login, old).unwrap();
        store.add(LogCategory::Login, fresh).unwrap();

        assert!(store.has(LogCategory::Login, old));
        let evicted = store
            .evict_older_than(LogCategory::Login, at(2025, 7, 4, 0))
            .unwrap();
        assert_eq!(evicted, 1);
        assert!(!store.has(LogCategory::Login, old));
        assert!(store.has(LogCategory::Login, fresh));

        let reopened = DedupStore::new(dir.path().to_path_buf());
        assert!(!reopened.has(LogCategory::Login, old));
    }

    #[test]
    fn test_unparseable_keys_are_evicted() {
        let dir = TempDir::new().unwrap();
        let store = DedupStore::new(dir.path().to_path_buf());
        store.add(LogCategory::Admin, "no timestamp here").unwrap();
        store
            .evict_older_than(LogCategory::Admin, at(2000, 1, 1, 0))
            .unwrap();
        assert_eq!(store.len(LogCategory::Admin), 0);
    }

    #[test]
    fn test_evict_expired_uses_category_retention() {
        let dir = TempDir::new().unwrap();
        let store = DedupStore::new(dir.path().to_path_buf());
        let key = "804481|2025.07.01-00.00.00|Destroyed";
        store.add(LogCategory::Destruction, key).unwrap();
        store.add(LogCategory::Login, "2025.07.01-00.00.00|1|Login").unwrap();

        let now = at(2025, 7, 10, 0);
        store.evict_expired(LogCategory::Destruction, now).unwrap();
        store.evict_expired(LogCategory::Login, now).unwrap();

        assert!(store.has(LogCategory::Destruction, key));
        assert_eq!(store.len(LogCategory::Login), 0);
    }

    #[test]
    fn test_reload_reads_disk() {
        let dir = TempDir::new().unwrap();
        let store = DedupStore::new(dir.path().to_path_buf());
        assert!(!store.has(LogCategory::Chat, "x"));
        std::fs::write(store.path(LogCategory::Chat), r#"["x"]"#).unwrap();
        store.reload(LogCategory::Chat);
        assert!(store.has(LogCategory::Chat, "x"));
    }
}
