//! Per-file debounce scheduling.
//!
//! Each tracked file moves through `Idle -> Debouncing -> Processing -> Idle`.
//! A trigger during `Debouncing` cancels the pending timer and starts a new
//! one. A timer that fires while the file is `Processing` is dropped, so two
//! passes over the same file never overlap. Idle slots are pruned on the next
//! trigger.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Work performed for a file once its triggers have settled.
#[async_trait]
pub trait FileProcessor: Send + Sync {
    async fn process(&self, path: &Path);
}

/// Observable state of a tracked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Idle,
    Debouncing,
    Processing,
}

/// Clears the in-flight marker when a pass ends, including by panic.
struct InFlight {
    flag: Arc<AtomicBool>,
    path: PathBuf,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!(path = %self.path.display(), "File processing panicked");
        }
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Debug, Default)]
struct FileSlot {
    /// Cancels the pending debounce timer, if any.
    pending: Option<CancellationToken>,
    /// Set while the file is being processed.
    in_flight: Arc<AtomicBool>,
}

/// Debounces triggers per file and serializes processing of each file.
pub struct FileScheduler {
    delay: Duration,
    processor: Arc<dyn FileProcessor>,
    slots: HashMap<PathBuf, FileSlot>,
    tracker: TaskTracker,
}

impl FileSlot {
    fn is_idle(&self) -> bool {
        !self.in_flight.load(Ordering::Acquire)
            && !matches!(&self.pending, Some(token) if !token.is_cancelled())
    }
}

impl FileScheduler {
    #[must_use]
    pub fn new(delay: Duration, processor: Arc<dyn FileProcessor>) -> Self {
        Self {
            delay,
            processor,
            slots: HashMap::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Current state of a file.
    #[must_use]
    pub fn state(&self, path: &Path) -> FileState {
        match self.slots.get(path) {
            Some(slot) if slot.in_flight.load(Ordering::Acquire) => FileState::Processing,
            Some(FileSlot {
                pending: Some(token),
                ..
            }) if !token.is_cancelled() => FileState::Debouncing,
            _ => FileState::Idle,
        }
    }

    /// Number of files with a pending timer or a pass in progress.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.slots.len()
    }

    /// Register a trigger for a file, restarting its debounce timer.
    pub fn trigger(&mut self, path: PathBuf) {
        self.slots.retain(|p, slot| p == &path || !slot.is_idle());
        let slot = self.slots.entry(path.clone()).or_default();
        if let Some(previous) = slot.pending.take() {
            previous.cancel();
        }

        let token = CancellationToken::new();
        slot.pending = Some(token.clone());
        let in_flight = Arc::clone(&slot.in_flight);
        let processor = Arc::clone(&self.processor);
        let delay = self.delay;

        self.tracker.spawn(async move {
            tokio::select! {
                () = token.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }
            // Claim the file before releasing the timer, so the slot never
            // looks idle in between.
            let claimed = in_flight
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok();
            // The timer has fired; later triggers start a fresh one.
            token.cancel();
            if !claimed {
                tracing::trace!(path = %path.display(), "Already processing, trigger dropped");
                return;
            }

            let _guard = InFlight {
                flag: in_flight,
                path: path.clone(),
            };
            processor.process(&path).await;
        });
    }

    /// Cancel pending timers and wait for in-flight processing to finish.
    ///
    /// Returns `false` if processing was still running after `grace`.
    pub async fn shutdown(self, grace: Duration) -> bool {
        for slot in self.slots.values() {
            if let Some(token) = &slot.pending {
                token.cancel();
            }
        }
        self.tracker.close();
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_ok() {
            true
        } else {
            tracing::warn!(
                remaining = self.tracker.len(),
                "In-flight processing did not finish before shutdown"
            );
            false
        }
    }
}
