//! Cache building blocks: keys, entries, and configuration.
//!
//! The engine that drives these lives in [`crate::client`]; this module
//! holds the value types it stores and hands out.

mod config;
mod entry;
mod key;

// Re-export main types
pub use config::{DEFAULT_BASE_URL, SyncConfig};
pub use entry::{CacheStatus, QuerySnapshot};
pub use key::CacheKey;

pub(crate) use entry::Entry;
