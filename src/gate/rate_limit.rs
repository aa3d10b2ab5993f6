//! Fixed-window rate limiting.
//!
//! One [`RateLimiter`] per route class, each holding one window per client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::clock::{SharedClock, SystemClock};
use crate::error::{ApiError, Result};

const FIFTEEN_MINUTES: Duration = Duration::from_secs(15 * 60);
const ONE_MINUTE: Duration = Duration::from_secs(60);

/// Client identity used when the peer address is unknown.
pub const UNKNOWN_CLIENT: &str = "unknown";

// == Policy ==
/// Limit applied to one route class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatePolicy {
    pub name: &'static str,
    pub max_requests: u32,
    pub window: Duration,
    pub message: &'static str,
}

impl RatePolicy {
    /// All `/api` routes: 100 requests per 15 minutes.
    pub fn general() -> Self {
        Self {
            name: "general",
            max_requests: 100,
            window: FIFTEEN_MINUTES,
            message: "Too many requests from this IP",
        }
    }

    /// Routes that may call upstream: 50 requests per 15 minutes.
    pub fn upstream() -> Self {
        Self {
            name: "upstream",
            max_requests: 50,
            window: FIFTEEN_MINUTES,
            message: "Too many requests to NASA API",
        }
    }

    /// Health check: 10 requests per minute.
    pub fn health() -> Self {
        Self {
            name: "health",
            max_requests: 10,
            window: ONE_MINUTE,
            message: "Too many health check requests",
        }
    }

    /// Human-readable window length, e.g. "15 minutes".
    pub fn retry_hint(&self) -> String {
        humanize(self.window)
    }

    fn window_ms(&self) -> u64 {
        self.window.as_millis() as u64
    }
}

fn humanize(window: Duration) -> String {
    let secs = window.as_secs();
    let (n, unit) = if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

// == Window ==
/// Request count for one client in the current window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitWindow {
    pub client_id: String,
    pub window_started_at: u64,
    pub count: u32,
}

/// Outcome of an admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the window resets
    pub reset_secs: u64,
}

// == Rate Limiter ==
/// Fixed-window counter keyed by client identity.
///
/// Each client's window opens on its first request and resets wholesale once
/// `policy.window` has elapsed.
#[derive(Debug)]
pub struct RateLimiter {
    policy: RatePolicy,
    /// Per-client windows; DashMap shards the lock across clients
    windows: DashMap<String, RateLimitWindow>,
    clock: SharedClock,
}

impl RateLimiter {
    pub fn new(policy: RatePolicy) -> Self {
        Self::with_clock(policy, SystemClock::shared())
    }

    pub fn with_clock(policy: RatePolicy, clock: SharedClock) -> Self {
        Self {
            policy,
            windows: DashMap::new(),
            clock,
        }
    }

    pub fn policy(&self) -> &RatePolicy {
        &self.policy
    }

    /// Counts a request from `client_id`, refusing it once the window is full.
    pub fn check(&self, client_id: &str) -> Result<RateLimitStatus> {
        let now = self.clock.now_ms();
        let window_ms = self.policy.window_ms();

        let mut window = self
            .windows
            .entry(client_id.to_string())
            .or_insert_with(|| RateLimitWindow {
                client_id: client_id.to_string(),
                window_started_at: now,
                count: 0,
            });

        if now.saturating_sub(window.window_started_at) >= window_ms {
            window.window_started_at = now;
            window.count = 0;
        }

        let elapsed = now.saturating_sub(window.window_started_at);
        let reset_secs = window_ms.saturating_sub(elapsed).div_ceil(1000);

        if window.count >= self.policy.max_requests {
            return Err(ApiError::RateLimited {
                message: self.policy.message.to_string(),
                retry_after: self.policy.retry_hint(),
                retry_after_secs: reset_secs,
            });
        }

        window.count += 1;
        Ok(RateLimitStatus {
            limit: self.policy.max_requests,
            remaining: self.policy.max_requests - window.count,
            reset_secs,
        })
    }

    /// Drops windows that have fully elapsed. Returns how many were dropped.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let window_ms = self.policy.window_ms();
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_sub(w.window_started_at) < window_ms);
        before.saturating_sub(self.windows.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

// == Route Class Limiters ==
/// The three independent limiters.
#[derive(Debug, Clone)]
pub struct RateLimiters {
    pub general: Arc<RateLimiter>,
    pub upstream: Arc<RateLimiter>,
    pub health: Arc<RateLimiter>,
}

impl RateLimiters {
    /// Standard policies on the given clock.
    pub fn standard(clock: SharedClock) -> Self {
        Self {
            general: Arc::new(RateLimiter::with_clock(RatePolicy::general(), clock.clone())),
            upstream: Arc::new(RateLimiter::with_clock(RatePolicy::upstream(), clock.clone())),
            health: Arc::new(RateLimiter::with_clock(RatePolicy::health(), clock)),
        }
    }

    pub fn all(&self) -> [&Arc<RateLimiter>; 3] {
        [&self.general, &self.upstream, &self.health]
    }

    /// Prunes elapsed windows in every limiter.
    pub fn prune_expired(&self) -> usize {
        self.all().iter().map(|limiter| limiter.prune_expired()).sum()
    }
}

impl Default for RateLimiters {
    fn default() -> Self {
        Self::standard(SystemClock::shared())
    }
}

// == Middleware ==
/// Client identity for rate limiting: the peer IP address.
pub fn client_id(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// axum middleware enforcing one limiter.
///
/// Limiters nest, so the innermost one that ran owns the RateLimit-* headers:
/// an outer limiter never overwrites headers already on the response.
pub async fn enforce_rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_id(&request);
    let path = request.uri().path().to_string();

    match limiter.check(&client) {
        Ok(status) => {
            debug!(
                policy = limiter.policy().name,
                client = %client,
                remaining = status.remaining,
                "Rate limit check passed"
            );
            let mut response = next.run(request).await;
            apply_headers(response.headers_mut(), &status);
            response
        }
        Err(err) => {
            warn!(policy = limiter.policy().name, client = %client, path = %path, "Rate limit exceeded");
            let reset_secs = match &err {
                ApiError::RateLimited {
                    retry_after_secs, ..
                } => *retry_after_secs,
                _ => 0,
            };
            let mut response = err.into_response();
            apply_headers(
                response.headers_mut(),
                &RateLimitStatus {
                    limit: limiter.policy().max_requests,
                    remaining: 0,
                    reset_secs,
                },
            );
            response
        }
    }
}

fn apply_headers(headers: &mut HeaderMap, status: &RateLimitStatus) {
    let pairs = [
        ("ratelimit-limit", status.limit as u64),
        ("ratelimit-remaining", status.remaining as u64),
        ("ratelimit-reset", status.reset_secs),
    ];
    for (name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
            headers.entry(HeaderName::from_static(name)).or_insert(value);
        }
    }
}
