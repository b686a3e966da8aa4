//! Per-category processing pipeline.
//!
//! Tail -> parse -> dedup -> format -> send -> record. A dedup key is
//! recorded only after its message was accepted by a webhook. When a send
//! fails transiently the file's offset stops at the start of that line, so
//! the next trigger retries it.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::category::LogCategory;
use crate::config::ConfigProvider;
use crate::parser::{normalize_line, parse_line};
use crate::state::{DedupStore, OffsetStore};
use crate::watcher::{file_key, list_category_files, tail, FileProcessor, WatcherError};
use crate::webhook::{format_event, MessageSink};

/// Counters for one pass over a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Complete lines read.
    pub lines: usize,
    /// Lines that parsed into events.
    pub events: usize,
    pub delivered: usize,
    /// Events skipped because their key was already recorded.
    pub duplicates: usize,
    /// Events dropped after a terminal delivery failure or with no webhook.
    pub dropped: usize,
    /// Set when a transient failure stopped the pass at this offset.
    pub stopped_at: Option<u64>,
    /// Offset persisted at the end of the pass.
    pub offset: u64,
}

/// Everything one category needs to turn log lines into webhook messages.
pub struct CategoryPipeline {
    category: LogCategory,
    offsets: Arc<OffsetStore>,
    dedup: Arc<DedupStore>,
    sink: Arc<dyn MessageSink>,
    config: Arc<dyn ConfigProvider>,
    /// Set once the missing webhook has been reported.
    webhook_missing_reported: AtomicBool,
}

impl CategoryPipeline {
    #[must_use]
    pub fn new(
        category: LogCategory,
        offsets: Arc<OffsetStore>,
        dedup: Arc<DedupStore>,
        sink: Arc<dyn MessageSink>,
        config: Arc<dyn ConfigProvider>,
    ) -> Self {
        Self {
            category,
            offsets,
            dedup,
            sink,
            config,
            webhook_missing_reported: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn category(&self) -> LogCategory {
        self.category
    }

    /// Process the lines appended to `path` since its stored offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read. The stored offset is
    /// left untouched in that case.
    pub async fn process_file(&self, path: &Path) -> Result<ProcessSummary, WatcherError> {
        let category = self.category;
        let file = file_key(path);
        let stored = self.offsets.offset_of(category, &file);
        let batch = tail(path, stored, category.encoding()).await?;

        let mut summary = ProcessSummary {
            lines: batch.lines.len(),
            offset: batch.new_offset,
            ..ProcessSummary::default()
        };

        // Re-read on every pass so config edits apply without a restart.
        let purpose = category.webhook_purpose();
        let webhook = self.config.webhook(purpose);
        match &webhook {
            Some(_) => self.webhook_missing_reported.store(false, Ordering::Relaxed),
            None if !batch.lines.is_empty() => {
                if !self.webhook_missing_reported.swap(true, Ordering::Relaxed) {
                    tracing::warn!(
                        %category,
                        webhook = purpose.as_str(),
                        "No webhook configured, new events are skipped"
                    );
                }
            }
            None => {}
        }
        let fallbacks = self.config.fallbacks(purpose);

        for line in &batch.lines {
            let text = normalize_line(&line.text);
            let Some(event) = parse_line(category, &text, &file) else {
                continue;
            };
            summary.events += 1;

            let key = event.dedup_key();
            if self.dedup.has(category, &key) {
                summary.duplicates += 1;
                continue;
            }

            let Some(url) = webhook.as_deref() else {
                summary.dropped += 1;
                continue;
            };

            let message = format_event(&event);
            match self.sink.send_with_fallback(url, &message, &fallbacks).await {
                Ok(delivery) => {
                    if let Some(fallback) = delivery.used_fallback {
                        tracing::info!(%category, fallback = %fallback, "Delivered through fallback webhook");
                    }
                    if let Err(e) = self.dedup.add(category, &key) {
                        tracing::warn!(%category, error = %e, "Failed to persist processed event");
                    }
                    summary.delivered += 1;
                }
                Err(e) if e.is_terminal() => {
                    tracing::warn!(%category, file = %file, error = %e, "Event rejected, skipping");
                    summary.dropped += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        %category,
                        file = %file,
                        offset = line.start,
                        error = %e,
                        "Delivery failed, will retry from this line"
                    );
                    summary.stopped_at = Some(line.start);
                    summary.offset = line.start;
                    break;
                }
            }
        }

        if summary.offset != stored || batch.truncated {
            if let Err(e) = self.offsets.set(category, &file, summary.offset) {
                tracing::warn!(%category, file = %file, error = %e, "Failed to persist offset");
            }
        }

        if summary.lines > 0 {
            tracing::debug!(
                %category,
                file = %file,
                lines = summary.lines,
                delivered = summary.delivered,
                duplicates = summary.duplicates,
                offset = summary.offset,
                "Processed log file"
            );
        }
        Ok(summary)
    }

    /// Mark every complete line in `dir` as read without sending anything.
    ///
    /// Returns the number of lines skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub async fn catch_up(&self, dir: &Path) -> Result<usize, WatcherError> {
        let category = self.category;
        let mut skipped = 0;

        for path in list_category_files(dir, category)? {
            let file = file_key(&path);
            let stored = self.offsets.offset_of(category, &file);
            let batch = match tail(&path, stored, category.encoding()).await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::debug!(%category, file = %file, error = %e, "Catch-up skipped file");
                    continue;
                }
            };
            if batch.new_offset != stored {
                if let Err(e) = self.offsets.set(category, &file, batch.new_offset) {
                    tracing::warn!(%category, file = %file, error = %e, "Failed to persist offset");
                }
            }
            skipped += batch.lines.len();
        }

        tracing::info!(%category, skipped, "Caught up with existing log files");
        Ok(skipped)
    }

    /// Send every unprocessed line of every file in `dir`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub async fn replay(&self, dir: &Path) -> Result<ProcessSummary, WatcherError> {
        let mut total = ProcessSummary::default();
        for path in list_category_files(dir, self.category)? {
            match self.process_file(&path).await {
                Ok(summary) => {
                    total.lines += summary.lines;
                    total.events += summary.events;
                    total.delivered += summary.delivered;
                    total.duplicates += summary.duplicates;
                    total.dropped += summary.dropped;
                }
                Err(e) => {
                    tracing::debug!(category = %self.category, path = %path.display(), error = %e, "Replay skipped file");
                }
            }
        }
        tracing::info!(
            category = %self.category,
            delivered = total.delivered,
            duplicates = total.duplicates,
            "Replayed existing log files"
        );
        Ok(total)
    }
}

#[async_trait]
impl FileProcessor for CategoryPipeline {
    async fn process(&self, path: &Path) {
        if let Err(e) = self.process_file(path).await {
            if e.is_transient() {
                tracing::debug!(category = %self.category, path = %path.display(), error = %e, "Skipping trigger");
            } else {
                tracing::warn!(category = %self.category, path = %path.display(), error = %e, "Failed to process log file");
            }
        }
    }
}
