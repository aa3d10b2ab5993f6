//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use serde_json::Value;

// == Cache Entry ==
/// A cached upstream payload with its storage time and lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload
    pub value: Value,
    /// Storage timestamp (Unix milliseconds)
    pub stored_at: u64,
    /// Lifetime in seconds
    pub ttl_seconds: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stored at `now_ms`.
    pub fn new(value: Value, ttl_seconds: u64, now_ms: u64) -> Self {
        Self {
            value,
            stored_at: now_ms,
            ttl_seconds,
        }
    }

    /// Unix millisecond timestamp at which the entry stops being valid.
    pub fn expires_at(&self) -> u64 {
        self.stored_at
            .saturating_add(self.ttl_seconds.saturating_mul(1000))
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// Boundary condition: an entry is expired once its age reaches the TTL,
    /// so a live entry always satisfies `age < ttl`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at()
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at().saturating_sub(now_ms)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new(json!({"title": "Pillars"}), 60, 1_000);

        assert_eq!(entry.value["title"], "Pillars");
        assert_eq!(entry.expires_at(), 61_000);
        assert!(!entry.is_expired(1_000));
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(json!(1), 1, 0);

        assert!(!entry.is_expired(999));
        assert!(entry.is_expired(1_000));
        assert!(entry.is_expired(5_000));
    }

    #[test]
    fn test_ttl_remaining_ms() {
        let entry = CacheEntry::new(json!(1), 10, 0);

        assert_eq!(entry.ttl_remaining_ms(0), 10_000);
        assert_eq!(entry.ttl_remaining_ms(9_500), 500);
        assert_eq!(entry.ttl_remaining_ms(20_000), 0);
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let entry = CacheEntry::new(json!(null), 0, 500);
        assert!(entry.is_expired(500), "Entry should be expired at boundary");
    }
}
