//! Service Module
//!
//! Cache-aside orchestration over the upstream resources: apply defaults,
//! derive the cache key, serve from cache or fetch and populate.

mod caching;
mod resource;

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::info;

use crate::cache::{cache_key, CacheStats, SharedCache};
use crate::error::{ApiError, Result};
use crate::models::{to_query_pairs, QueryParams};
use crate::upstream::{Upstream, UpstreamRequest};

pub use caching::with_caching;
pub use resource::Resource;

/// Sentinel category that disables event filtering.
pub const ALL_CATEGORIES: &str = "all";

// == Space Service ==
/// Cache-aside front for every upstream resource.
#[derive(Clone)]
pub struct SpaceService {
    cache: SharedCache,
    upstream: Arc<dyn Upstream>,
}

impl SpaceService {
    pub fn new(cache: SharedCache, upstream: Arc<dyn Upstream>) -> Self {
        Self { cache, upstream }
    }

    /// Shared handle to the underlying cache store.
    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    /// Fetches `resource` with validated `params`, using today's UTC date for
    /// date-window defaults.
    pub async fn fetch(&self, resource: Resource, params: QueryParams) -> Result<Value> {
        self.fetch_on(resource, params, chrono::Utc::now().date_naive())
            .await
    }

    /// Same as [`fetch`](Self::fetch) with an explicit reference date.
    pub async fn fetch_on(
        &self,
        resource: Resource,
        mut params: QueryParams,
        today: NaiveDate,
    ) -> Result<Value> {
        // Events are cached unfiltered; the category filter runs per read.
        let category = match resource {
            Resource::EonetEvents => params.remove("category").and_then(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            }),
            _ => None,
        };

        resource.apply_defaults(&mut params, today);
        let key = cache_key(resource.cache_name(), &params);

        let request = UpstreamRequest::new(resource.host(), resource.path(), to_query_pairs(&params));
        let upstream = Arc::clone(&self.upstream);
        let payload = with_caching(&self.cache, key, resource.ttl_secs(), move || async move {
            upstream.fetch(request).await.map_err(|e| relabel(e, resource))
        })
        .await?;

        Ok(match category {
            Some(category) => filter_events(payload, &category),
            None => payload,
        })
    }

    pub async fn get_apod(&self, params: QueryParams) -> Result<Value> {
        self.fetch(Resource::Apod, params).await
    }

    pub async fn get_insight_weather(&self, params: QueryParams) -> Result<Value> {
        self.fetch(Resource::InsightWeather, params).await
    }

    pub async fn get_eonet_events(&self, params: QueryParams) -> Result<Value> {
        self.fetch(Resource::EonetEvents, params).await
    }

    pub async fn get_eonet_categories(&self) -> Result<Value> {
        self.fetch(Resource::EonetCategories, QueryParams::new())
            .await
    }

    pub async fn get_donki_cme(&self, params: QueryParams) -> Result<Value> {
        self.fetch(Resource::DonkiCme, params).await
    }

    pub async fn get_donki_solar_flares(&self, params: QueryParams) -> Result<Value> {
        self.fetch(Resource::DonkiSolarFlares, params).await
    }

    pub async fn get_donki_geomagnetic_storms(&self, params: QueryParams) -> Result<Value> {
        self.fetch(Resource::DonkiGeomagneticStorms, params).await
    }

    pub async fn get_donki_notifications(&self, params: QueryParams) -> Result<Value> {
        self.fetch(Resource::DonkiNotifications, params).await
    }

    // == Cache Management ==
    pub async fn clear_cache(&self) {
        self.cache.write().await.flush();
        info!("Cache cleared");
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.read().await.stats()
    }
}

/// Prefixes upstream HTTP failures with the resource that failed.
fn relabel(err: ApiError, resource: Resource) -> ApiError {
    match err {
        ApiError::UpstreamError { status, body, .. } => ApiError::UpstreamError {
            message: format!("Failed to fetch {}", resource.label()),
            status,
            body,
        },
        other => other,
    }
}

/// Keeps only events with a category whose id or title equals `category`,
/// ignoring case. `all` keeps everything.
pub fn filter_events(mut payload: Value, category: &str) -> Value {
    if category.eq_ignore_ascii_case(ALL_CATEGORIES) {
        return payload;
    }
    let wanted = category.to_lowercase();

    if let Some(events) = payload.get_mut("events").and_then(Value::as_array_mut) {
        events.retain(|event| {
            event
                .get("categories")
                .and_then(Value::as_array)
                .is_some_and(|cats| cats.iter().any(|cat| category_matches(cat, &wanted)))
        });
    }
    payload
}

fn category_matches(category: &Value, wanted: &str) -> bool {
    let id_matches = match category.get("id") {
        Some(Value::String(id)) => id.to_lowercase() == wanted,
        Some(Value::Number(id)) => id.to_string() == wanted,
        _ => false,
    };
    let title_matches = category
        .get("title")
        .and_then(Value::as_str)
        .is_some_and(|title| title.to_lowercase() == wanted);
    id_matches || title_matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{self, CacheStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Upstream double that records requests and replays one response.
    struct RecordingUpstream {
        calls: AtomicUsize,
        last: Mutex<Option<UpstreamRequest>>,
        response: fn() -> Result<Value>,
    }

    impl RecordingUpstream {
        fn new(response: fn() -> Result<Value>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
                response,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Upstream for RecordingUpstream {
        async fn fetch(&self, request: UpstreamRequest) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(request);
            (self.response)()
        }
    }

    fn events_payload() -> Result<Value> {
        Ok(json!({
            "title": "EONET Events",
            "events": [
                {"id": "E1", "categories": [{"id": 8, "title": "Wildfires"}]},
                {"id": "E2", "categories": [{"id": 10, "title": "Severe Storms"}]},
                {"id": "E3", "categories": [{"id": 12, "title": "Volcanoes"}, {"id": 8, "title": "Wildfires"}]},
                {"id": "E4"}
            ]
        }))
    }

    fn service_with(upstream: Arc<RecordingUpstream>) -> SpaceService {
        SpaceService::new(cache::shared(CacheStore::new(100, 300)), upstream)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn event_ids(payload: &Value) -> Vec<String> {
        payload["events"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_apod_defaults_and_caches() {
        let upstream = RecordingUpstream::new(|| Ok(json!({"title": "Orion"})));
        let service = service_with(upstream.clone());

        let first = service.get_apod(QueryParams::new()).await.unwrap();
        let second = service.get_apod(QueryParams::new()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(upstream.calls(), 1);

        let request = upstream.last.lock().unwrap().clone().unwrap();
        assert_eq!(request.path, "/planetary/apod");
        assert_eq!(request.query["count"], "1");

        assert!(service.cache().write().await.get(r#"apod:{"count":1}"#).is_some());
    }

    #[tokio::test]
    async fn test_explicit_default_shares_cache_entry() {
        let upstream = RecordingUpstream::new(|| Ok(json!([])));
        let service = service_with(upstream.clone());

        let mut explicit = QueryParams::new();
        explicit.insert("count".into(), json!(1));

        service.get_apod(QueryParams::new()).await.unwrap();
        service.get_apod(explicit).await.unwrap();

        assert_eq!(upstream.calls(), 1);
    }

    #[tokio::test]
    async fn test_upstream_errors_propagate_and_are_not_cached() {
        let upstream = RecordingUpstream::new(|| {
            Err(ApiError::UpstreamError {
                message: "raw".into(),
                status: 500,
                body: None,
            })
        });
        let service = service_with(upstream.clone());

        for _ in 0..2 {
            let err = service.get_insight_weather(QueryParams::new()).await.unwrap_err();
            match err {
                ApiError::UpstreamError { message, status, .. } => {
                    assert_eq!(status, 500);
                    assert_eq!(message, "Failed to fetch InSight weather");
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(upstream.calls(), 2);
        assert_eq!(service.cache_stats().await.key_count, 0);
    }

    #[tokio::test]
    async fn test_event_category_filter_runs_on_every_read() {
        let upstream = RecordingUpstream::new(events_payload);
        let service = service_with(upstream.clone());

        let mut wildfires = QueryParams::new();
        wildfires.insert("category".into(), json!("WILDFIRES"));
        let filtered = service
            .fetch_on(Resource::EonetEvents, wildfires, today())
            .await
            .unwrap();
        assert_eq!(event_ids(&filtered), vec!["E1", "E3"]);

        let mut storms = QueryParams::new();
        storms.insert("category".into(), json!("10"));
        let filtered = service
            .fetch_on(Resource::EonetEvents, storms, today())
            .await
            .unwrap();
        assert_eq!(event_ids(&filtered), vec!["E2"]);

        let unfiltered = service
            .fetch_on(Resource::EonetEvents, QueryParams::new(), today())
            .await
            .unwrap();
        assert_eq!(unfiltered["events"].as_array().unwrap().len(), 4);

        // One unfiltered upstream payload served all three reads
        assert_eq!(upstream.calls(), 1);
        let request = upstream.last.lock().unwrap().clone().unwrap();
        assert!(!request.query.contains_key("category"));
    }

    #[tokio::test]
    async fn test_blank_category_means_no_filter() {
        let upstream = RecordingUpstream::new(events_payload);
        let service = service_with(upstream.clone());

        for blank in ["", "  "] {
            let mut params = QueryParams::new();
            params.insert("category".into(), json!(blank));
            let payload = service.get_eonet_events(params).await.unwrap();
            assert_eq!(payload["events"].as_array().unwrap().len(), 4);
        }

        assert_eq!(upstream.calls(), 1);
    }

    #[tokio::test]
    async fn test_categories_use_long_ttl_key() {
        let upstream = RecordingUpstream::new(|| Ok(json!({"categories": []})));
        let service = service_with(upstream.clone());

        service.get_eonet_categories().await.unwrap();

        let cache = service.cache().read().await;
        assert_eq!(cache.ttl_remaining("eonet_categories:{}"), Some(3600));
    }

    #[tokio::test]
    async fn test_donki_defaults_reach_upstream() {
        let upstream = RecordingUpstream::new(|| Ok(json!([])));
        let service = service_with(upstream.clone());

        service
            .fetch_on(Resource::DonkiSolarFlares, QueryParams::new(), today())
            .await
            .unwrap();

        let request = upstream.last.lock().unwrap().clone().unwrap();
        assert_eq!(request.path, "/DONKI/FLR");
        assert_eq!(request.query["startDate"], "2024-02-14");
        assert_eq!(request.query["endDate"], "2024-03-15");
    }

    #[tokio::test]
    async fn test_clear_cache_resets_stats() {
        let upstream = RecordingUpstream::new(|| Ok(json!({})));
        let service = service_with(upstream.clone());

        service.get_donki_cme(QueryParams::new()).await.unwrap();
        assert_eq!(service.cache_stats().await.key_count, 1);

        service.clear_cache().await;
        assert_eq!(service.cache_stats().await.key_count, 0);

        service.get_donki_cme(QueryParams::new()).await.unwrap();
        assert_eq!(upstream.calls(), 2);
    }

    #[test]
    fn test_filter_all_keeps_everything() {
        let payload = events_payload().unwrap();
        let filtered = filter_events(payload.clone(), "all");
        assert_eq!(filtered, payload);
    }

    #[test]
    fn test_filter_without_events_is_untouched() {
        let payload = json!({"message": "nothing here"});
        assert_eq!(filter_events(payload.clone(), "wildfires"), payload);
    }
}
