//! Request Gate Module
//!
//! Checks applied before a request reaches the service layer:
//! per-route-class rate limiting and query-parameter validation.

pub mod rate_limit;
pub mod validation;

pub use rate_limit::{
    enforce_rate_limit, RateLimitStatus, RateLimitWindow, RateLimiter, RateLimiters, RatePolicy,
};
pub use validation::validate;
