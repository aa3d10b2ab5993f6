//! Cache Module
//!
//! Provides the in-memory upstream response cache with TTL expiration.

mod entry;
mod key;
mod stats;
mod store;


use std::sync::Arc;

use tokio::sync::RwLock;

// Re-export public types
pub use entry::CacheEntry;
pub use key::cache_key;
pub use stats::CacheStats;
pub use store::CacheStore;

/// Cache store shared between request tasks and the sweep task.
pub type SharedCache = Arc<RwLock<CacheStore>>;

// == Public Constants ==
/// TTL in seconds applied when a caller does not pass one
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Interval in seconds between background sweeps
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 600;

/// Wraps a store for sharing.
pub fn shared(store: CacheStore) -> SharedCache {
    Arc::new(RwLock::new(store))
}
