//! TTL Sweep Task
//!
//! Background task that periodically removes expired cache entries and
//! elapsed rate-limit windows. Reads never depend on it having run.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedCache;
use crate::gate::RateLimiters;

/// Spawns a background task that sweeps the cache and the rate limiters.
///
/// The task sleeps for the interval between runs and only holds the cache
/// write lock while sweeping.
///
/// # Arguments
/// * `cache` - Shared cache store
/// * `limiters` - Rate limiters whose stale windows are pruned
/// * `cleanup_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
pub fn spawn_cleanup_task(
    cache: SharedCache,
    limiters: RateLimiters,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting TTL sweep task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let (removed, stats) = {
                let mut cache_guard = cache.write().await;
                let removed = cache_guard.cleanup_expired();
                (removed, cache_guard.stats())
            };
            let pruned = limiters.prune_expired();
            let hit_rate = stats.hit_rate() * 100.0;

            if removed > 0 || pruned > 0 {
                info!(
                    "TTL sweep: removed {} expired entries, {} stale rate-limit windows, {} keys live, hit rate {:.1}%",
                    removed, pruned, stats.key_count, hit_rate
                );
            } else {
                debug!(
                    "TTL sweep: nothing to remove, {} keys live, hit rate {:.1}%",
                    stats.key_count, hit_rate
                );
            }
        }
    })
}
