//! Upstream Module
//!
//! Outbound HTTP access to the NASA API (keyed) and EONET (no key).

mod client;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use client::UpstreamClient;

/// Default upstream timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

// == Host ==
/// Upstream host a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    /// api.nasa.gov, requires `api_key`
    Nasa,
    /// EONET, no key
    Eonet,
}

impl Host {
    /// Whether requests to this host carry the API key.
    pub fn requires_key(self) -> bool {
        matches!(self, Host::Nasa)
    }
}

// == Upstream Request ==
/// A single outbound GET.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub host: Host,
    pub path: String,
    pub query: BTreeMap<String, String>,
    /// Overrides the client's default timeout when set
    pub timeout: Option<Duration>,
}

impl UpstreamRequest {
    pub fn new(host: Host, path: impl Into<String>, query: BTreeMap<String, String>) -> Self {
        Self {
            host,
            path: path.into(),
            query,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// == Upstream Trait ==
/// Something that can answer an [`UpstreamRequest`] with a JSON payload.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch(&self, request: UpstreamRequest) -> Result<Value>;
}
