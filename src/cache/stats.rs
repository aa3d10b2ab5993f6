//! Cache Statistics Module
//!
//! Tracks cache hit/miss counters and the live key count.

use serde::Serialize;

// == Cache Stats ==
/// Cumulative cache counters since start or last flush.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Current number of entries in the cache
    pub key_count: usize,
    /// Number of successful cache retrievals
    pub hit_count: u64,
    /// Number of failed cache retrievals (absent or expired)
    pub miss_count: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hit_count += 1;
    }

    pub fn record_miss(&mut self) {
        self.miss_count += 1;
    }

    pub fn set_key_count(&mut self, count: usize) {
        self.key_count = count;
    }
}
