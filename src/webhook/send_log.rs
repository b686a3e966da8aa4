//! Capped log of delivery outcomes, kept for observability.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{read_json, write_json_atomic};

/// File name of the persisted send log inside the state directory.
pub const SEND_LOG_FILE: &str = "discord_send_log.json";

const URL_PREFIX_CHARS: usize = 50;
const PREVIEW_CHARS: usize = 100;

/// Outcome of one send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendLogEntry {
    pub timestamp: DateTime<Utc>,
    pub webhook_prefix: String,
    pub message_preview: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendLogEntry {
    #[must_use]
    pub fn new(url: &str, text: &str, error: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            webhook_prefix: shorten(url, URL_PREFIX_CHARS),
            message_preview: shorten(text, PREVIEW_CHARS),
            success: error.is_none(),
            error,
        }
    }
}

fn shorten(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Aggregate counts over the send log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Ring buffer of the most recent send outcomes, optionally persisted.
#[derive(Debug)]
pub struct SendLog {
    capacity: usize,
    path: Option<PathBuf>,
    ring: Mutex<Ring>,
    /// Generation of the last snapshot written to disk.
    persisted: tokio::sync::Mutex<u64>,
}

#[derive(Debug, Default)]
struct Ring {
    entries: VecDeque<SendLogEntry>,
    /// Bumped on every record so stale snapshots are never written last.
    generation: u64,
}

impl SendLog {
    /// In-memory log.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            path: None,
            ring: Mutex::new(Ring::default()),
            persisted: tokio::sync::Mutex::new(0),
        }
    }

    /// Log persisted at `path`, seeded with what is already there.
    #[must_use]
    pub fn open(path: PathBuf, capacity: usize) -> Self {
        let mut entries: VecDeque<SendLogEntry> = match read_json::<Vec<SendLogEntry>>(&path) {
            Ok(existing) => existing.unwrap_or_default().into(),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable send log");
                VecDeque::new()
            }
        };
        while entries.len() > capacity {
            entries.pop_front();
        }
        Self {
            capacity,
            path: Some(path),
            ring: Mutex::new(Ring {
                entries,
                generation: 0,
            }),
            persisted: tokio::sync::Mutex::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Ring> {
        self.ring
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Append an entry, dropping the oldest beyond capacity.
    ///
    /// The file is written on the blocking pool from a snapshot taken
    /// under the lock.
    pub async fn record(&self, entry: SendLogEntry) {
        let (snapshot, generation) = {
            let mut ring = self.lock();
            ring.entries.push_back(entry);
            while ring.entries.len() > self.capacity {
                ring.entries.pop_front();
            }
            ring.generation += 1;
            let snapshot: Option<Vec<SendLogEntry>> = self
                .path
                .as_ref()
                .map(|_| ring.entries.iter().cloned().collect());
            (snapshot, ring.generation)
        };

        let (Some(path), Some(snapshot)) = (self.path.clone(), snapshot) else {
            return;
        };
        let mut persisted = self.persisted.lock().await;
        if *persisted >= generation {
            return;
        }
        match tokio::task::spawn_blocking(move || write_json_atomic(&path, &snapshot)).await {
            Ok(Ok(())) => *persisted = generation,
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to persist send log"),
            Err(e) => tracing::warn!(error = %e, "Send log writer failed"),
        }
    }

    /// Copy of the current entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<SendLogEntry> {
        self.lock().entries.iter().cloned().collect()
    }

    #[must_use]
    pub fn stats(&self) -> SendStats {
        let ring = self.lock();
        let entries = &ring.entries;
        let success = entries.iter().filter(|e| e.success).count();
        SendStats {
            total: entries.len(),
            success,
            failed: entries.len() - success,
            last_error: entries.iter().rev().find_map(|e| e.error.clone()),
        }
    }
}
