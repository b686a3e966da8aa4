//! Persisted per-category state: read offsets and processed event keys.

mod dedup;
mod error;
mod offsets;
mod persist;

pub use dedup::{key_timestamp, DedupStore};
pub use error::StateError;
pub use offsets::{effective_offset, OffsetStore};
pub use persist::{read_json, write_json_atomic};
