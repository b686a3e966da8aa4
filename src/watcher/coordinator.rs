//! Decides when a category's log files are tailed.
//!
//! Three independent trigger sources feed one channel: the debounced
//! cross-platform watcher, optional raw OS notifications, and a polling loop
//! that re-checks every matching file on a fixed interval. Triggers are
//! at-least-once; the [`FileScheduler`] collapses duplicates.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::category::LogCategory;

use super::discovery::list_category_files;
use super::error::WatcherError;
use super::schedule::{FileProcessor, FileScheduler};
use super::visibility::force_visibility_loop;

type FileDebouncer = Debouncer<RecommendedWatcher, RecommendedCache>;

/// Grace period for in-flight processing at shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Where a trigger came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Debounced,
    Native,
    Poll,
}

/// A request to look at a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub path: PathBuf,
    pub source: TriggerSource,
}

/// Tuning for a coordinator.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Per-file debounce window.
    pub debounce: Duration,
    /// Quiet period of the debounced watcher.
    pub stability: Duration,
    pub poll_interval: Duration,
    pub native_events: bool,
    /// Interval of the force-visibility workaround, if enabled.
    pub force_visibility: Option<Duration>,
}

impl WatchOptions {
    /// Defaults for a category.
    #[must_use]
    pub fn for_category(category: LogCategory) -> Self {
        Self {
            debounce: Duration::from_millis(100),
            stability: Duration::from_millis(50),
            poll_interval: category.poll_interval(),
            native_events: true,
            force_visibility: None,
        }
    }
}

/// Watches a logs directory for one category.
#[derive(Debug, Clone)]
pub struct WatchCoordinator {
    category: LogCategory,
    dir: PathBuf,
    options: WatchOptions,
}

impl WatchCoordinator {
    #[must_use]
    pub fn new(category: LogCategory, dir: PathBuf, options: WatchOptions) -> Self {
        Self {
            category,
            dir,
            options,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run until `cancel` fires, then drain in-flight processing.
    ///
    /// A failing filesystem watcher is logged and the polling loop carries
    /// on alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the logs directory does not exist.
    pub async fn run(
        self,
        processor: Arc<dyn FileProcessor>,
        cancel: CancellationToken,
    ) -> Result<(), WatcherError> {
        if !self.dir.is_dir() {
            return Err(WatcherError::LogsDirUnavailable(self.dir.clone()));
        }

        let (trigger_tx, mut trigger_rx) = mpsc::unbounded_channel();

        let _debouncer = match self.start_debounced(trigger_tx.clone()) {
            Ok(debouncer) => Some(debouncer),
            Err(e) => {
                tracing::warn!(category = %self.category, error = %e, "Debounced watcher unavailable, relying on polling");
                None
            }
        };

        let _native = if self.options.native_events {
            match self.start_native(trigger_tx.clone()) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!(category = %self.category, error = %e, "Native watcher unavailable");
                    None
                }
            }
        } else {
            None
        };

        tokio::spawn(poll_loop(
            self.category,
            self.dir.clone(),
            self.options.poll_interval,
            trigger_tx.clone(),
            cancel.clone(),
        ));

        if let Some(interval) = self.options.force_visibility {
            tokio::spawn(force_visibility_loop(
                self.category,
                self.dir.clone(),
                interval,
                cancel.clone(),
            ));
        }
        drop(trigger_tx);

        tracing::info!(
            category = %self.category,
            dir = %self.dir.display(),
            poll_interval_ms = u64::try_from(self.options.poll_interval.as_millis()).unwrap_or(u64::MAX),
            "Watching log directory"
        );

        let mut scheduler = FileScheduler::new(self.options.debounce, processor);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                trigger = trigger_rx.recv() => match trigger {
                    Some(trigger) => {
                        tracing::trace!(
                            category = %self.category,
                            path = %trigger.path.display(),
                            source = ?trigger.source,
                            "Trigger"
                        );
                        scheduler.trigger(trigger.path);
                    }
                    None => break,
                },
            }
        }

        tracing::debug!(category = %self.category, "Coordinator stopping");
        scheduler.shutdown(SHUTDOWN_GRACE).await;
        Ok(())
    }

    fn start_debounced(
        &self,
        tx: mpsc::UnboundedSender<Trigger>,
    ) -> Result<FileDebouncer, WatcherError> {
        let category = self.category;
        let mut debouncer = new_debouncer(
            self.options.stability,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    for event in &events {
                        forward(category, &event.event, TriggerSource::Debounced, &tx);
                    }
                }
                Err(errors) => {
                    for error in errors {
                        tracing::warn!(%category, error = %error, "Debounced watcher error");
                    }
                }
            },
        )?;
        debouncer.watch(&self.dir, RecursiveMode::NonRecursive)?;
        Ok(debouncer)
    }

    fn start_native(
        &self,
        tx: mpsc::UnboundedSender<Trigger>,
    ) -> Result<RecommendedWatcher, WatcherError> {
        let category = self.category;
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            match result {
                Ok(event) => forward(category, &event, TriggerSource::Native, &tx),
                Err(error) => tracing::warn!(%category, error = %error, "Native watcher error"),
            }
        })?;
        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;
        Ok(watcher)
    }
}

/// Turn a filesystem event into triggers for matching files.
fn forward(
    category: LogCategory,
    event: &notify::Event,
    source: TriggerSource,
    tx: &mpsc::UnboundedSender<Trigger>,
) {
    if !is_content_event(event.kind) {
        return;
    }
    for path in &event.paths {
        if category.matches_file(path) {
            let _ = tx.send(Trigger {
                path: path.clone(),
                source,
            });
        }
    }
}

fn is_content_event(kind: EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any)
}

/// Re-check every matching file on a fixed interval.
async fn poll_loop(
    category: LogCategory,
    dir: PathBuf,
    interval: Duration,
    tx: mpsc::UnboundedSender<Trigger>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(interval) => {}
        }

        let files = match list_category_files(&dir, category) {
            Ok(files) => files,
            Err(e) => {
                tracing::debug!(%category, error = %e, "Poll could not list logs directory");
                continue;
            }
        };
        for path in files {
            if tx
                .send(Trigger {
                    path,
                    source: TriggerSource::Poll,
                })
                .is_err()
            {
                return;
            }
        }
    }
}
