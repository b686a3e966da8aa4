//! Wires the watcher, parser, state stores and webhook sink together for
//! each log category.

mod pipeline;
mod runner;

pub use pipeline::{CategoryPipeline, ProcessSummary};
pub use runner::{
    watch_options, SupervisorOptions, WatcherSupervisor, EVICTION_INTERVAL, RESTART_DELAY,
};
