//! Log file watching and tailing.
//!
//! Discovers category log files, decides when to read them and reads only
//! the complete lines appended since the last pass.

mod coordinator;
mod discovery;
mod error;
mod schedule;
mod tailer;
mod visibility;

pub use coordinator::{Trigger, TriggerSource, WatchCoordinator, WatchOptions, SHUTDOWN_GRACE};
pub use discovery::{file_key, find_latest_file, list_category_files};
pub use error::WatcherError;
pub use schedule::{FileProcessor, FileScheduler, FileState};
pub use tailer::{split_lines, tail, LineTailer, TailBatch, TailedLine};
pub use visibility::{shadow_path, touch_latest};
