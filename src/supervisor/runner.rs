//! Owns the long-lived per-category tasks.
//!
//! Each category runs in its own task: startup pass, then the watch
//! coordinator and the dedup eviction timer. A category that fails or
//! panics is logged and restarted without affecting the others.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::category::{LogCategory, StartupMode};
use crate::config::{ConfigProvider, WatchConfig};
use crate::state::{DedupStore, OffsetStore};
use crate::watcher::{WatchCoordinator, WatchOptions, WatcherError, SHUTDOWN_GRACE};
use crate::webhook::MessageSink;

use super::pipeline::CategoryPipeline;

/// How often expired dedup keys are evicted.
pub const EVICTION_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Delay before a category retries after its logs directory was unavailable
/// or its task failed.
pub const RESTART_DELAY: Duration = Duration::from_secs(30);

/// Tuning for the supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    pub categories: Vec<LogCategory>,
    pub watch: WatchConfig,
    pub eviction_interval: Duration,
    pub restart_delay: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            categories: LogCategory::ALL.to_vec(),
            watch: WatchConfig::default(),
            eviction_interval: EVICTION_INTERVAL,
            restart_delay: RESTART_DELAY,
        }
    }
}

/// Coordinator settings for a category.
#[must_use]
pub fn watch_options(category: LogCategory, watch: &WatchConfig) -> WatchOptions {
    WatchOptions {
        debounce: watch.debounce(),
        stability: watch.stability(),
        poll_interval: watch
            .poll_interval_ms
            .map_or_else(|| category.poll_interval(), Duration::from_millis),
        native_events: watch.native_events,
        force_visibility: watch
            .force_visibility
            .then(|| Duration::from_secs(watch.force_visibility_interval_secs.max(1))),
    }
}

/// Shared handles every category task receives.
#[derive(Clone)]
struct Shared {
    offsets: Arc<OffsetStore>,
    dedup: Arc<DedupStore>,
    sink: Arc<dyn MessageSink>,
    config: Arc<dyn ConfigProvider>,
    options: SupervisorOptions,
}

/// Runs the watchers of every log category.
pub struct WatcherSupervisor {
    shared: Shared,
    cancel: CancellationToken,
    tasks: JoinSet<LogCategory>,
}

impl WatcherSupervisor {
    #[must_use]
    pub fn new(
        state_dir: PathBuf,
        sink: Arc<dyn MessageSink>,
        config: Arc<dyn ConfigProvider>,
        options: SupervisorOptions,
    ) -> Self {
        Self {
            shared: Shared {
                offsets: Arc::new(OffsetStore::new(state_dir.clone())),
                dedup: Arc::new(DedupStore::new(state_dir)),
                sink,
                config,
                options,
            },
            cancel: CancellationToken::new(),
            tasks: JoinSet::new(),
        }
    }

    #[must_use]
    pub fn offsets(&self) -> &Arc<OffsetStore> {
        &self.shared.offsets
    }

    #[must_use]
    pub fn dedup(&self) -> &Arc<DedupStore> {
        &self.shared.dedup
    }

    /// Token that stops every category when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of category tasks still running.
    #[must_use]
    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    /// Spawn one task per configured category.
    pub fn start(&mut self) {
        for &category in &self.shared.options.categories {
            let shared = self.shared.clone();
            let cancel = self.cancel.child_token();
            self.tasks.spawn(async move {
                supervise_category(category, shared, cancel).await;
                category
            });
        }
        tracing::info!(categories = self.tasks.len(), "Watcher supervisor started");
    }

    /// Stop every category and wait for in-flight work.
    ///
    /// Tasks still running after the grace period are aborted.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        let drain = async {
            while let Some(result) = self.tasks.join_next().await {
                match result {
                    Ok(category) => tracing::debug!(%category, "Category stopped"),
                    Err(e) => tracing::warn!(error = %e, "Category task ended abnormally"),
                }
            }
        };
        // Coordinators drain with their own grace; allow a little on top.
        if tokio::time::timeout(SHUTDOWN_GRACE + Duration::from_secs(1), drain)
            .await
            .is_err()
        {
            tracing::warn!(remaining = self.tasks.len(), "Aborting category tasks after grace period");
            self.tasks.abort_all();
        }
        tracing::info!("Watcher supervisor stopped");
    }
}

/// Run a category, restarting it after a failure or panic.
async fn supervise_category(category: LogCategory, shared: Shared, cancel: CancellationToken) {
    let restart_delay = shared.options.restart_delay;
    loop {
        let handle = tokio::spawn(run_category(category, shared.clone(), cancel.clone()));
        let outcome = handle.await;
        if cancel.is_cancelled() {
            return;
        }
        match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => {
                tracing::warn!(%category, error = %e, "Category stopped, retrying later");
            }
            Err(e) => {
                tracing::error!(%category, error = %e, "Category task panicked, restarting later");
            }
        }
        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(restart_delay) => {}
        }
    }
}

/// Wait until a logs directory is configured. Reports a missing setting once.
async fn await_logs_dir(
    category: LogCategory,
    config: &dyn ConfigProvider,
    retry: Duration,
    cancel: &CancellationToken,
) -> Option<PathBuf> {
    let mut reported = false;
    loop {
        if let Some(dir) = config.logs_path() {
            return Some(dir);
        }
        if !reported {
            tracing::warn!(%category, "No logs path configured, watcher disabled until it is set");
            reported = true;
        }
        tokio::select! {
            () = cancel.cancelled() => return None,
            () = tokio::time::sleep(retry) => {}
        }
    }
}

async fn run_category(
    category: LogCategory,
    shared: Shared,
    cancel: CancellationToken,
) -> Result<(), WatcherError> {
    let Some(dir) =
        await_logs_dir(category, shared.config.as_ref(), shared.options.restart_delay, &cancel)
            .await
    else {
        return Ok(());
    };
    if !dir.is_dir() {
        return Err(WatcherError::LogsDirUnavailable(dir));
    }

    shared.dedup.reload(category);
    evict(category, &shared.dedup);

    let pipeline = Arc::new(CategoryPipeline::new(
        category,
        Arc::clone(&shared.offsets),
        Arc::clone(&shared.dedup),
        Arc::clone(&shared.sink),
        Arc::clone(&shared.config),
    ));

    match category.startup_mode() {
        StartupMode::CatchUp => {
            pipeline.catch_up(&dir).await?;
        }
        StartupMode::Replay => {
            pipeline.replay(&dir).await?;
        }
    }

    let eviction = tokio::spawn(eviction_loop(
        category,
        Arc::clone(&shared.dedup),
        shared.options.eviction_interval,
        cancel.clone(),
    ));

    let coordinator =
        WatchCoordinator::new(category, dir, watch_options(category, &shared.options.watch));
    let result = coordinator.run(pipeline, cancel).await;
    eviction.abort();
    result
}

fn evict(category: LogCategory, dedup: &DedupStore) {
    // Game timestamps are server-local wall clock.
    let now = chrono::Local::now().naive_local();
    if let Err(e) = dedup.evict_expired(category, now) {
        tracing::warn!(%category, error = %e, "Dedup eviction failed");
    }
}

async fn eviction_loop(
    category: LogCategory,
    dedup: Arc<DedupStore>,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(interval) => {}
        }
        evict(category, &dedup);
    }
}
