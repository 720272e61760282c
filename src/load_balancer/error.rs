//! Load balancer error types.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors surfaced while routing, forwarding or probing.
///
/// None of these are fatal; the balancer keeps serving errors while
/// backends are down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadBalancerError {
    /// Every backend in the pool is currently marked unhealthy.
    #[error("no healthy backend available")]
    NoHealthyBackend,

    /// Transport failure while forwarding a request.
    #[error("backend {url} unreachable: {reason}")]
    BackendUnreachable { url: String, reason: String },

    /// The backend's body is bigger than the relay buffer allows.
    #[error("response from {url} exceeds the {limit} byte body cap")]
    ResponseTooLarge { url: String, limit: usize },

    /// A health probe did not get a 200 from the backend.
    #[error("health probe to {url} failed: {reason}")]
    ProbeFailure { url: String, reason: String },
}

impl LoadBalancerError {
    /// Status code reported to the client for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            LoadBalancerError::NoHealthyBackend => StatusCode::SERVICE_UNAVAILABLE,
            LoadBalancerError::BackendUnreachable { .. }
            | LoadBalancerError::ResponseTooLarge { .. }
            | LoadBalancerError::ProbeFailure { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Result alias for load balancer operations.
pub type LoadBalancerResult<T> = Result<T, LoadBalancerError>;
