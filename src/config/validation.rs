//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate backend URLs and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::BalancerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one backend must be configured")]
    NoBackends,

    #[error("invalid backend url '{url}': {reason}")]
    InvalidBackendUrl { url: String, reason: String },

    #[error("backend '{0}' is listed more than once")]
    DuplicateBackend(String),

    #[error("timeouts.request_secs ({request_secs}) must exceed timeouts.upstream_secs ({upstream_secs})")]
    RequestTimeoutTooShort { request_secs: u64, upstream_secs: u64 },

    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
}

/// Check a configuration, collecting every violation.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    for raw in &config.backends {
        match Url::parse(raw) {
            Ok(url) if url.scheme() != "http" => errors.push(ValidationError::InvalidBackendUrl {
                url: raw.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Ok(url) if url.host_str().is_none() => {
                errors.push(ValidationError::InvalidBackendUrl {
                    url: raw.clone(),
                    reason: "missing host".to_string(),
                })
            }
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::InvalidBackendUrl {
                url: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    let mut seen = HashSet::new();
    for raw in &config.backends {
        if !seen.insert(raw.as_str()) {
            errors.push(ValidationError::DuplicateBackend(raw.clone()));
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let checks = [
        ("health_check.interval_secs", config.health_check.interval_secs == 0),
        ("health_check.timeout_secs", config.health_check.timeout_secs == 0),
        ("rate_limit.max_requests", config.rate_limit.max_requests == 0),
        ("rate_limit.window_secs", config.rate_limit.window_secs == 0),
        ("dispatch.workers", config.dispatch.workers == Some(0)),
        ("dispatch.queue_capacity", config.dispatch.queue_capacity == Some(0)),
        ("timeouts.request_secs", config.timeouts.request_secs == 0),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs == 0),
    ];
    for (field, failed) in checks {
        if failed {
            errors.push(ValidationError::NotPositive(field));
        }
    }

    // The request deadline must leave room for the upstream one to fire first.
    let timeouts = &config.timeouts;
    if timeouts.upstream_secs > 0 && timeouts.request_secs <= timeouts.upstream_secs {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request_secs: timeouts.request_secs,
            upstream_secs: timeouts.upstream_secs,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
