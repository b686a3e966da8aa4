//! Configuration module.

mod loader;
mod provider;
mod types;

pub use loader::*;
pub use provider::*;
pub use types::*;
