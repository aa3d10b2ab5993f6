//! API Routes
//!
//! Configures the Axum router with all proxy endpoints.

use axum::{
    http::{HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::warn;

use super::handlers::{
    apod_handler, cache_stats_handler, clear_cache_handler, donki_cme_handler,
    donki_geomagnetic_storms_handler, donki_notifications_handler, donki_solar_flares_handler,
    eonet_categories_handler, eonet_events_handler, health_handler, insight_weather_handler,
    not_found_handler, root_handler, AppState,
};
use crate::gate::enforce_rate_limit;

/// Content Security Policy sent with every response.
pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
base-uri 'self'; \
font-src 'self' https: data:; \
form-action 'self'; \
frame-ancestors 'self'; \
img-src 'self' data: https: http:; \
object-src 'none'; \
script-src 'self'; \
script-src-attr 'none'; \
style-src 'self' 'unsafe-inline'; \
connect-src 'self' https://api.openweathermap.org; \
upgrade-insecure-requests";

/// Browser hardening headers, added unless a handler already set them.
pub const SECURITY_HEADERS: [(&str, &str); 12] = [
    ("content-security-policy", CONTENT_SECURITY_POLICY),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

/// Creates the main router, allowing any CORS origin.
pub fn create_router(state: AppState) -> Router {
    build_router(state, AllowOrigin::from(Any))
}

/// Creates the main router, allowing only `frontend_url` as CORS origin.
pub fn create_router_for_origin(state: AppState, frontend_url: &str) -> Router {
    let origin = match HeaderValue::from_str(frontend_url) {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            warn!("Invalid FRONTEND_URL '{}', allowing any origin", frontend_url);
            AllowOrigin::from(Any)
        }
    };
    build_router(state, origin)
}

/// # Endpoints
/// - `GET /` - Service banner
/// - `GET /api/apod`, `/api/insight_weather`, `/api/eonet/events`,
///   `/api/eonet/categories`, `/api/donki/*` - Cached upstream data
/// - `POST /api/cache/clear`, `GET /api/cache/stats` - Cache operations
/// - `GET /api/health` - Health check
///
/// # Middleware
/// - Rate limits: general on every `/api` route, upstream on data and cache
///   routes, health on the health route
/// - Security headers, CORS, gzip compression, request tracing
fn build_router(state: AppState, origin: AllowOrigin) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let limiters = state.limiters.clone();

    let upstream_routes = Router::new()
        .route("/apod", get(apod_handler))
        .route("/insight_weather", get(insight_weather_handler))
        .route("/eonet/events", get(eonet_events_handler))
        .route("/eonet/categories", get(eonet_categories_handler))
        .route("/donki/cme", get(donki_cme_handler))
        .route("/donki/solar-flares", get(donki_solar_flares_handler))
        .route(
            "/donki/geomagnetic-storms",
            get(donki_geomagnetic_storms_handler),
        )
        .route("/donki/notifications", get(donki_notifications_handler))
        .route("/cache/clear", post(clear_cache_handler))
        .route("/cache/stats", get(cache_stats_handler))
        .route_layer(from_fn_with_state(limiters.upstream, enforce_rate_limit));

    let health_routes = Router::new()
        .route("/health", get(health_handler))
        .route_layer(from_fn_with_state(limiters.health, enforce_rate_limit));

    let api = upstream_routes
        .merge(health_routes)
        .route_layer(from_fn_with_state(limiters.general, enforce_rate_limit));

    let mut router = Router::new()
        .route("/", get(root_handler))
        .nest("/api", api)
        .fallback(not_found_handler);

    for (name, value) in SECURITY_HEADERS {
        router = router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }

    router
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
