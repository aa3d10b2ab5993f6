//! Cache-aside helper.

use std::future::Future;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::SharedCache;
use crate::error::Result;

/// Serves `key` from the cache, or runs `fetch` and stores its result.
///
/// The lock is never held across `fetch`. Errors from `fetch` are returned
/// as-is and nothing is cached for them. A failed cache write is logged and
/// the fresh value is still returned.
pub async fn with_caching<F, Fut>(cache: &SharedCache, key: String, ttl: u64, fetch: F) -> Result<Value>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value>>,
{
    let cached = cache.write().await.get(&key);
    if let Some(value) = cached {
        debug!("Cache hit for key: {}", key);
        return Ok(value);
    }

    debug!("Cache miss for key: {}", key);
    let value = fetch().await?;

    if let Err(e) = cache.write().await.set(key.clone(), value.clone(), Some(ttl)) {
        warn!("Could not cache key {}: {}", key, e);
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{self, CacheStore};
    use crate::error::ApiError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let cache = cache::shared(CacheStore::new(10, 300));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value = with_caching(&cache, "k".into(), 60, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"n": 1}))
            })
            .await
            .unwrap();
            assert_eq!(value, json!({"n": 1}));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = cache::shared(CacheStore::new(10, 300));

        let result = with_caching(&cache, "k".into(), 60, || async {
            Err(ApiError::UpstreamTimeout("slow".into()))
        })
        .await;

        assert!(matches!(result, Err(ApiError::UpstreamTimeout(_))));
        assert!(cache.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_full_cache_still_returns_fresh_value() {
        let cache = cache::shared(CacheStore::new(1, 300));
        cache
            .write()
            .await
            .set("other".into(), json!(0), None)
            .unwrap();

        let value = with_caching(&cache, "k".into(), 60, || async { Ok(json!("fresh")) })
            .await
            .unwrap();

        assert_eq!(value, json!("fresh"));
        assert!(cache.write().await.get("k").is_none());
    }
}
