//! API Module
//!
//! HTTP handlers and routing for the proxy REST API.
//!
//! # Endpoints
//! - `GET /api/apod` - Astronomy Picture of the Day
//! - `GET /api/insight_weather` - Mars InSight lander weather
//! - `GET /api/eonet/events` - Earth events, optionally filtered by category
//! - `GET /api/eonet/categories` - Earth event categories
//! - `GET /api/donki/{cme,solar-flares,geomagnetic-storms,notifications}` - Space weather
//! - `POST /api/cache/clear` - Flush the response cache
//! - `GET /api/cache/stats` - Cache counters
//! - `GET /api/health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::{create_router, create_router_for_origin};
