//! Cache Store Module
//!
//! Keyed JSON payload store with per-entry TTL. Expiry is checked lazily on
//! every read; the background sweep only reclaims memory.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{CacheEntry, CacheStats};
use crate::clock::{SharedClock, SystemClock};
use crate::error::{ApiError, Result};

// == Cache Store ==
/// Response cache with TTL expiry.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Hit/miss counters
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Default TTL in seconds for entries without explicit TTL
    default_ttl: u64,
    clock: SharedClock,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore on the system clock.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries the cache can hold
    /// * `default_ttl` - Default TTL in seconds for entries without explicit TTL
    pub fn new(max_entries: usize, default_ttl: u64) -> Self {
        Self::with_clock(max_entries, default_ttl, SystemClock::shared())
    }

    /// Creates a new CacheStore reading time from `clock`.
    pub fn with_clock(max_entries: usize, default_ttl: u64, clock: SharedClock) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            max_entries,
            default_ttl,
            clock,
        }
    }

    // == Set ==
    /// Stores a payload, overwriting any previous entry for `key`.
    ///
    /// When the store is full, expired entries are reclaimed first; if none
    /// can be reclaimed the write is refused.
    ///
    /// # Arguments
    /// * `key` - The cache key
    /// * `value` - The payload to store
    /// * `ttl` - Optional TTL in seconds (uses default_ttl if None)
    pub fn set(&mut self, key: String, value: Value, ttl: Option<u64>) -> Result<()> {
        let is_overwrite = self.entries.contains_key(&key);

        if !is_overwrite && self.entries.len() >= self.max_entries {
            self.cleanup_expired();
            if self.entries.len() >= self.max_entries {
                return Err(ApiError::Cache(format!(
                    "Cache is full ({} entries), refusing to store '{}'",
                    self.max_entries, key
                )));
            }
        }

        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry = CacheEntry::new(value, ttl, self.clock.now_ms());
        self.entries.insert(key, entry);
        self.stats.set_key_count(self.entries.len());

        Ok(())
    }

    // == Get ==
    /// Retrieves a payload by key.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let now = self.clock.now_ms();

        match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                self.entries.remove(key);
                self.stats.set_key_count(self.entries.len());
                self.stats.record_miss();
                debug!("Cache key expired: {}", key);
                None
            }
            Some(entry) => {
                let value = entry.value.clone();
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Delete ==
    /// Removes an entry by key, returning whether one was present.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        self.stats.set_key_count(self.entries.len());
        removed
    }

    // == Flush ==
    /// Removes every entry and resets the counters.
    pub fn flush(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.stats = CacheStats::new();
        info!(dropped, "Cache flushed");
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_key_count(self.entries.len());
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();

        self.entries.retain(|key, entry| {
            let expired = entry.is_expired(now);
            if expired {
                debug!("Cache key expired: {}", key);
            }
            !expired
        });

        self.stats.set_key_count(self.entries.len());
        before - self.entries.len()
    }

    /// Remaining lifetime of `key` in seconds, if it is live.
    pub fn ttl_remaining(&self, key: &str) -> Option<u64> {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.ttl_remaining_ms(now) / 1000)
    }

    // == Length ==
    /// Returns the number of stored entries, including not-yet-swept expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
