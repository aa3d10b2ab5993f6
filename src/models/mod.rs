//! Request and Response models for the proxy API
//!
//! This module defines the DTOs used for query parameters and for the
//! response bodies the proxy produces itself.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{param_to_string, to_query_pairs, QueryParams, RawQuery};
pub use responses::{
    now_iso, CacheStatsResponse, ClearCacheResponse, ErrorResponse, HealthResponse, MemoryUsage,
    RootResponse,
};
