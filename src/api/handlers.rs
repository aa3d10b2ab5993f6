//! API Handlers
//!
//! HTTP request handlers for each proxy endpoint.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{OriginalUri, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::info;

use crate::cache::{self, CacheStore};
use crate::clock::SystemClock;
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::gate::{validate, RateLimiters};
use crate::models::{
    CacheStatsResponse, ClearCacheResponse, HealthResponse, MemoryUsage, QueryParams, RawQuery,
    RootResponse,
};
use crate::service::{Resource, SpaceService};
use crate::upstream::{Upstream, UpstreamClient};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache-aside front for the upstream resources
    pub service: SpaceService,
    /// Per-route-class rate limiters
    pub limiters: RateLimiters,
    /// Deployment environment name
    pub environment: Arc<str>,
    pub started_at: Instant,
}

impl AppState {
    /// Creates a new AppState around an already-built service.
    pub fn new(service: SpaceService, limiters: RateLimiters, environment: &str) -> Self {
        Self {
            service,
            limiters,
            environment: Arc::from(environment),
            started_at: Instant::now(),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the cache store and the reqwest-backed upstream client.
    pub fn from_config(config: &Config) -> Result<Self> {
        let upstream: Arc<dyn Upstream> = Arc::new(UpstreamClient::from_config(config)?);
        let store = CacheStore::new(config.max_entries, config.default_ttl);
        let service = SpaceService::new(cache::shared(store), upstream);
        let limiters = RateLimiters::standard(SystemClock::shared());
        Ok(Self::new(service, limiters, &config.environment))
    }
}

/// Logs the request and validates its query for `resource`.
fn validated(resource: Resource, raw: &RawQuery) -> Result<QueryParams> {
    info!(query = ?raw, "{} request", resource.label());
    validate(resource, raw)
}

/// Handler for GET /api/apod
pub async fn apod_handler(
    State(state): State<AppState>,
    Query(raw): Query<RawQuery>,
) -> Result<Json<Value>> {
    let params = validated(Resource::Apod, &raw)?;
    Ok(Json(state.service.get_apod(params).await?))
}

/// Handler for GET /api/insight_weather
pub async fn insight_weather_handler(
    State(state): State<AppState>,
    Query(raw): Query<RawQuery>,
) -> Result<Json<Value>> {
    let params = validated(Resource::InsightWeather, &raw)?;
    Ok(Json(state.service.get_insight_weather(params).await?))
}

/// Handler for GET /api/eonet/events
pub async fn eonet_events_handler(
    State(state): State<AppState>,
    Query(raw): Query<RawQuery>,
) -> Result<Json<Value>> {
    let params = validated(Resource::EonetEvents, &raw)?;
    Ok(Json(state.service.get_eonet_events(params).await?))
}

/// Handler for GET /api/eonet/categories
pub async fn eonet_categories_handler(State(state): State<AppState>) -> Result<Json<Value>> {
    info!("EONET categories request");
    Ok(Json(state.service.get_eonet_categories().await?))
}

/// Handler for GET /api/donki/cme
pub async fn donki_cme_handler(
    State(state): State<AppState>,
    Query(raw): Query<RawQuery>,
) -> Result<Json<Value>> {
    let params = validated(Resource::DonkiCme, &raw)?;
    Ok(Json(state.service.get_donki_cme(params).await?))
}

/// Handler for GET /api/donki/solar-flares
pub async fn donki_solar_flares_handler(
    State(state): State<AppState>,
    Query(raw): Query<RawQuery>,
) -> Result<Json<Value>> {
    let params = validated(Resource::DonkiSolarFlares, &raw)?;
    Ok(Json(state.service.get_donki_solar_flares(params).await?))
}

/// Handler for GET /api/donki/geomagnetic-storms
pub async fn donki_geomagnetic_storms_handler(
    State(state): State<AppState>,
    Query(raw): Query<RawQuery>,
) -> Result<Json<Value>> {
    let params = validated(Resource::DonkiGeomagneticStorms, &raw)?;
    Ok(Json(state.service.get_donki_geomagnetic_storms(params).await?))
}

/// Handler for GET /api/donki/notifications
pub async fn donki_notifications_handler(
    State(state): State<AppState>,
    Query(raw): Query<RawQuery>,
) -> Result<Json<Value>> {
    let params = validated(Resource::DonkiNotifications, &raw)?;
    Ok(Json(state.service.get_donki_notifications(params).await?))
}

/// Handler for POST /api/cache/clear
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    info!("Cache clear request");
    state.service.clear_cache().await;
    Json(ClearCacheResponse::new())
}

/// Handler for GET /api/cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    info!("Cache stats request");
    Json(CacheStatsResponse::new(state.service.cache_stats().await))
}

/// Handler for GET /api/health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let response = HealthResponse::ok(
        state.started_at.elapsed().as_secs_f64(),
        &state.environment,
        process_memory(),
        state.service.cache_stats().await,
    );
    info!(uptime = response.uptime, cache = ?response.cache, "Health check");
    Json(response)
}

/// Handler for GET /
pub async fn root_handler(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse::new(&state.environment))
}

/// Fallback for unmatched routes.
pub async fn not_found_handler(OriginalUri(uri): OriginalUri) -> Response {
    let path = uri.path().to_string();
    let err = ApiError::NotFound("Endpoint not found".to_string());
    let mut body = err.to_body();
    body.path = Some(path.clone());
    tracing::warn!(path = %path, "404 Not Found");
    (err.status_code(), Json(body)).into_response()
}

/// Resident and virtual memory of this process.
fn process_memory() -> MemoryUsage {
    let Ok(pid) = sysinfo::get_current_pid() else {
        return MemoryUsage::default();
    };
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing().with_memory(),
    );
    system
        .process(pid)
        .map(|p| MemoryUsage {
            resident: p.memory(),
            virtual_memory: p.virtual_memory(),
        })
        .unwrap_or_default()
}
