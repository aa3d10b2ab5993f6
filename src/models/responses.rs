//! Response DTOs for the proxy API
//!
//! Defines the structure of outgoing HTTP response bodies that the proxy
//! builds itself. Upstream payloads are passed through as raw JSON.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;
use crate::error::FieldViolation;

/// Current time as ISO 8601 with millisecond precision.
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Response body for POST /api/cache/clear
#[derive(Debug, Clone, Serialize)]
pub struct ClearCacheResponse {
    pub message: String,
    pub timestamp: String,
}

impl ClearCacheResponse {
    pub fn new() -> Self {
        Self {
            message: "Cache cleared successfully".to_string(),
            timestamp: now_iso(),
        }
    }
}

impl Default for ClearCacheResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Response body for GET /api/cache/stats
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub cache: CacheStats,
    pub timestamp: String,
}

impl CacheStatsResponse {
    pub fn new(cache: CacheStats) -> Self {
        Self {
            cache,
            timestamp: now_iso(),
        }
    }
}

/// Process memory figures reported by the health endpoint, in bytes.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub resident: u64,
    pub virtual_memory: u64,
}

/// Response body for GET /api/health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always "OK" when the handler runs
    pub status: String,
    pub timestamp: String,
    /// Seconds since the server started
    pub uptime: f64,
    pub environment: String,
    pub version: String,
    pub memory: MemoryUsage,
    pub cache: CacheStats,
}

impl HealthResponse {
    pub fn ok(uptime: f64, environment: &str, memory: MemoryUsage, cache: CacheStats) -> Self {
        Self {
            status: "OK".to_string(),
            timestamp: now_iso(),
            uptime,
            environment: environment.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            memory,
            cache,
        }
    }
}

/// Response body for GET /
#[derive(Debug, Clone, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub environment: String,
    pub timestamp: String,
    pub endpoints: Value,
}

impl RootResponse {
    pub fn new(environment: &str) -> Self {
        Self {
            message: "NASA Explorer API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: environment.to_string(),
            timestamp: now_iso(),
            endpoints: serde_json::json!({
                "apod": "/api/apod",
                "insight_weather": "/api/insight_weather",
                "eonet_events": "/api/eonet/events",
                "eonet_categories": "/api/eonet/categories",
                "donki_cme": "/api/donki/cme",
                "donki_solar_flares": "/api/donki/solar-flares",
                "donki_geomagnetic_storms": "/api/donki/geomagnetic-storms",
                "donki_notifications": "/api/donki/notifications",
                "cache_clear": "/api/cache/clear",
                "cache_stats": "/api/cache/stats",
                "health": "/api/health",
            }),
        }
    }
}

/// Error response body shared by all error conditions
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
    pub status: u16,
    pub timestamp: String,
    /// Taxonomy tag, e.g. `NASA_API_ERROR`
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>, status: u16, error_type: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status,
            timestamp: now_iso(),
            error_type: error_type.into(),
            details: None,
            retry_after: None,
            path: None,
        }
    }
}
