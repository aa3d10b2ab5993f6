//! Upstream HTTP Client
//!
//! reqwest-backed [`Upstream`] implementation. Appends the API key for the
//! keyed host only and maps transport failures onto [`ApiError`] kinds.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};

use super::{Host, Upstream, UpstreamRequest, DEFAULT_TIMEOUT};
use crate::config::Config;
use crate::error::{ApiError, Result};

/// HTTP client for the NASA and EONET hosts.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    nasa_base_url: String,
    eonet_base_url: String,
    api_key: String,
    default_timeout: Duration,
}

impl UpstreamClient {
    /// Creates a client for the given hosts.
    pub fn new(
        nasa_base_url: impl Into<String>,
        eonet_base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("space_proxy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            nasa_base_url: nasa_base_url.into(),
            eonet_base_url: eonet_base_url.into(),
            api_key: api_key.into(),
            default_timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Creates a client from server configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.nasa_base_url.clone(),
            config.eonet_base_url.clone(),
            config.nasa_api_key.clone(),
        )?
        .with_default_timeout(config.upstream_timeout()))
    }

    /// Sets the timeout used when a request does not carry its own.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    fn url_for(&self, host: Host, path: &str) -> String {
        let base = match host {
            Host::Nasa => &self.nasa_base_url,
            Host::Eonet => &self.eonet_base_url,
        };
        format!("{}{}", base.trim_end_matches('/'), path)
    }

    /// Query pairs actually sent, including the key when required.
    fn query_pairs<'a>(&'a self, request: &'a UpstreamRequest) -> Vec<(&'a str, &'a str)> {
        let mut pairs: Vec<(&str, &str)> = request
            .query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if request.host.requires_key() {
            pairs.push(("api_key", self.api_key.as_str()));
        }
        pairs
    }
}

/// Maps a reqwest transport failure onto an error kind.
fn transport_error(err: &reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::UpstreamTimeout("NASA API request timeout".to_string())
    } else {
        ApiError::UpstreamUnavailable("NASA API service unavailable".to_string())
    }
}

#[async_trait]
impl Upstream for UpstreamClient {
    async fn fetch(&self, request: UpstreamRequest) -> Result<Value> {
        let url = self.url_for(request.host, &request.path);
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let param_keys: Vec<&str> = request.query.keys().map(String::as_str).collect();

        debug!(method = "GET", path = %request.path, params = ?param_keys, "Upstream request");

        let response = self
            .http
            .get(&url)
            .query(&self.query_pairs(&request))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                error!(path = %request.path, error = %e, "Upstream request failed");
                transport_error(&e)
            })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            error!(path = %request.path, error = %e, "Upstream body read failed");
            transport_error(&e)
        })?;

        debug!(status = status.as_u16(), bytes = bytes.len(), path = %request.path, "Upstream response");

        if !status.is_success() {
            let body = if bytes.is_empty() {
                None
            } else {
                Some(
                    serde_json::from_slice(&bytes)
                        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())),
                )
            };
            error!(status = status.as_u16(), path = %request.path, "Upstream returned error status");
            return Err(ApiError::UpstreamError {
                message: format!("NASA API Error: request to {} failed", request.path),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            error!(path = %request.path, error = %e, "Upstream returned invalid JSON");
            ApiError::UpstreamError {
                message: format!("NASA API Error: invalid JSON from {}", request.path),
                status: 502,
                body: None,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};
    use std::net::SocketAddr;

    /// Serves a stub upstream on an ephemeral port.
    async fn spawn_stub() -> SocketAddr {
        let app = Router::new()
            .route(
                "/planetary/apod",
                get(|Query(q): Query<HashMap<String, String>>| async move { Json(json!(q)) }),
            )
            .route(
                "/events",
                get(|Query(q): Query<HashMap<String, String>>| async move { Json(json!(q)) }),
            )
            .route(
                "/forbidden",
                get(|| async { (StatusCode::FORBIDDEN, Json(json!({"error": "API_KEY_INVALID"}))) }),
            )
            .route("/html", get(|| async { "<html>not json</html>" }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Json(json!({}))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn client_for(addr: SocketAddr) -> UpstreamClient {
        let base = format!("http://{}", addr);
        UpstreamClient::new(base.clone(), base, "secret-key").unwrap()
    }

    fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_keyed_host_gets_api_key() {
        let addr = spawn_stub().await;
        let client = client_for(addr);

        let body = client
            .fetch(UpstreamRequest::new(
                Host::Nasa,
                "/planetary/apod",
                query(&[("count", "1")]),
            ))
            .await
            .unwrap();

        assert_eq!(body["count"], "1");
        assert_eq!(body["api_key"], "secret-key");
    }

    #[tokio::test]
    async fn test_no_key_host_gets_no_api_key() {
        let addr = spawn_stub().await;
        let client = client_for(addr);

        let body = client
            .fetch(UpstreamRequest::new(
                Host::Eonet,
                "/events",
                query(&[("status", "open")]),
            ))
            .await
            .unwrap();

        assert_eq!(body["status"], "open");
        assert!(body.get("api_key").is_none());
    }

    #[tokio::test]
    async fn test_non_success_maps_to_upstream_error() {
        let addr = spawn_stub().await;
        let client = client_for(addr);

        let err = client
            .fetch(UpstreamRequest::new(Host::Nasa, "/forbidden", BTreeMap::new()))
            .await
            .unwrap_err();

        match err {
            ApiError::UpstreamError { status, body, .. } => {
                assert_eq!(status, 403);
                assert_eq!(body.unwrap()["error"], "API_KEY_INVALID");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_maps_to_bad_gateway() {
        let addr = spawn_stub().await;
        let client = client_for(addr);

        let err = client
            .fetch(UpstreamRequest::new(Host::Nasa, "/html", BTreeMap::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::UpstreamError { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_timeout_maps_to_upstream_timeout() {
        let addr = spawn_stub().await;
        let client = client_for(addr);

        let err = client
            .fetch(
                UpstreamRequest::new(Host::Nasa, "/slow", BTreeMap::new())
                    .with_timeout(Duration::from_millis(50)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::UpstreamTimeout(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_unavailable() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(addr);
        let err = client
            .fetch(UpstreamRequest::new(Host::Eonet, "/events", BTreeMap::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::UpstreamUnavailable(_)));
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = UpstreamClient::new("http://nasa/", "http://eonet", "k").unwrap();
        assert_eq!(client.url_for(Host::Nasa, "/DONKI/CME"), "http://nasa/DONKI/CME");
        assert_eq!(client.url_for(Host::Eonet, "/events"), "http://eonet/events");
    }
}
