//! Cache key derivation.

use crate::models::QueryParams;

/// Builds the cache key for a resource and its defaulted parameters.
///
/// The parameter map serializes with sorted keys, so two requests carrying
/// the same pairs in any order share a key, e.g. `apod:{"count":1}`.
pub fn cache_key(resource: &str, params: &QueryParams) -> String {
    // A BTreeMap of JSON values always serializes.
    let serialized = serde_json::to_string(params).unwrap_or_else(|_| "{}".to_string());
    format!("{}:{}", resource, serialized)
}
