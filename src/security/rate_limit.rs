//! Sliding window rate limiting, per client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Admission control over a trailing time window.
///
/// Each client keeps the timestamps of its admitted requests. Stale entries
/// are dropped lazily, on that client's next call.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    access_records: DashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            access_records: DashMap::new(),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    /// Check and record a request from `client_id` at the current time.
    pub fn is_allowed(&self, client_id: &str) -> bool {
        self.is_allowed_at(client_id, Instant::now())
    }

    /// Check and record a request from `client_id` at `now`.
    pub fn is_allowed_at(&self, client_id: &str, now: Instant) -> bool {
        // The entry guard holds the shard lock, so prune, count and append
        // happen as one step for this client.
        let mut times = self.access_records.entry(client_id.to_owned()).or_default();

        if let Some(window_start) = now.checked_sub(self.window) {
            times.retain(|t| *t >= window_start);
        }

        if times.len() < self.max_requests {
            times.push(now);
            true
        } else {
            false
        }
    }

    /// Number of clients with a record (including ones whose window emptied).
    pub fn tracked_clients(&self) -> usize {
        self.access_records.len()
    }
}

/// Middleware rejecting clients over their limit with 429.
///
/// Keys on the peer IP, never on request headers.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = addr.ip().to_string();

    if limiter.is_allowed(&client) {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, "Rate limit exceeded");
        metrics::record_rate_limited();
        (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response()
    }
}
