//! Configuration Module
//!
//! Handles loading server configuration from environment variables.

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Startup configuration failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set in environment variables")]
    Missing(&'static str),
}

/// Server configuration parameters.
///
/// All values except the NASA API key have defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Key appended to every NASA API request
    pub nasa_api_key: String,
    /// Base URL of the keyed NASA API host
    pub nasa_base_url: String,
    /// Base URL of the EONET host (no key required)
    pub eonet_base_url: String,
    /// Upstream request timeout in milliseconds
    pub upstream_timeout_ms: u64,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Background sweep interval in seconds
    pub cleanup_interval: u64,
    /// Maximum number of cached responses
    pub max_entries: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Deployment environment name
    pub environment: String,
    /// Origin allowed by CORS
    pub frontend_url: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `NASA_API_KEY` - NASA API key (required)
    /// - `NASA_BASE_URL` - NASA API host (default: https://api.nasa.gov)
    /// - `EONET_BASE_URL` - EONET host (default: https://eonet.gsfc.nasa.gov/api/v2.1)
    /// - `UPSTREAM_TIMEOUT_MS` - Upstream timeout (default: 10000)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 600)
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 10000)
    /// - `PORT` - HTTP server port (default: 3001)
    /// - `APP_ENV` - Environment name (default: development)
    /// - `FRONTEND_URL` - CORS origin (default: http://localhost:3000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |name: &str| lookup(name).and_then(|v| v.parse().ok());

        let nasa_api_key = lookup("NASA_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("NASA_API_KEY"))?;

        Ok(Self {
            nasa_api_key,
            nasa_base_url: lookup("NASA_BASE_URL").unwrap_or(defaults.nasa_base_url),
            eonet_base_url: lookup("EONET_BASE_URL").unwrap_or(defaults.eonet_base_url),
            upstream_timeout_ms: parsed("UPSTREAM_TIMEOUT_MS")
                .unwrap_or(defaults.upstream_timeout_ms),
            default_ttl: parsed("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            cleanup_interval: parsed("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            max_entries: lookup("MAX_ENTRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_entries),
            server_port: lookup("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            environment: lookup("APP_ENV").unwrap_or(defaults.environment),
            frontend_url: lookup("FRONTEND_URL").unwrap_or(defaults.frontend_url),
        })
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nasa_api_key: String::new(),
            nasa_base_url: "https://api.nasa.gov".to_string(),
            eonet_base_url: "https://eonet.gsfc.nasa.gov/api/v2.1".to_string(),
            upstream_timeout_ms: 10_000,
            default_ttl: crate::cache::DEFAULT_TTL_SECS,
            cleanup_interval: crate::cache::DEFAULT_SWEEP_INTERVAL_SECS,
            max_entries: 10_000,
            server_port: 3001,
            environment: "development".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}
