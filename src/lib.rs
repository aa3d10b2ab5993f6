//! Space Proxy - caching proxy for NASA space-data APIs
//!
//! Fronts the NASA API and EONET with a TTL response cache, per-route rate
//! limits and query validation, for consumption by a browser dashboard.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod models;
pub mod service;
pub mod tasks;
pub mod upstream;

pub use api::AppState;
pub use config::Config;
pub use error::{ApiError, Result};
pub use tasks::spawn_cleanup_task;
