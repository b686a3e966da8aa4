//! Game server log relay.
//!
//! Tails the log files a game server writes, parses new lines into typed
//! events and relays them to Discord webhooks, exactly once per event across
//! restarts as far as delivery confirmation allows.

pub mod category;
pub mod config;
pub mod parser;
pub mod state;
pub mod supervisor;
pub mod watcher;
pub mod webhook;
