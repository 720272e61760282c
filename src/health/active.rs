//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe backends
//! - Update backend health state based on results

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio::sync::broadcast;
use axum::http::StatusCode;

use crate::config::HealthCheckConfig;
use crate::http::upstream::Upstream;
use crate::load_balancer::{BackendPool, LoadBalancerError, LoadBalancerResult};
use crate::observability::metrics;

pub struct HealthMonitor {
    pool: Arc<BackendPool>,
    config: HealthCheckConfig,
    client: Upstream,
}

impl HealthMonitor {
    pub fn new(pool: Arc<BackendPool>, config: HealthCheckConfig) -> Self {
        // Health checks read only the status line; no body is buffered.
        let client = Upstream::new(Duration::from_secs(config.timeout_secs), 0);

        Self {
            pool,
            config,
            client,
        }
    }

    /// Probe every backend on a fixed interval until shutdown fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            backends = self.pool.len(),
            "Health monitor starting"
        );

        let interval = Duration::from_secs(self.config.interval_secs);
        let mut ticker = time::interval(interval);
        // A slow cycle delays the next one instead of bursting to catch up.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one probe cycle over the pool, in pool order.
    ///
    /// Entries are updated by position, so a URL listed twice is tracked
    /// once per entry.
    pub async fn check_all(&self) {
        for (index, backend) in self.pool.backends().into_iter().enumerate() {
            let healthy = match self.probe(&backend.url).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(backend = %backend.url, error = %e, "Health check failed");
                    false
                }
            };

            if self.pool.set_health_at(index, healthy) {
                tracing::info!(backend = %backend.url, healthy, "Backend health changed");
            }

            metrics::record_backend_health(&backend.url, healthy);
        }
    }

    /// GET the backend's base URL; only an exact 200 counts as healthy.
    pub async fn probe(&self, url: &str) -> LoadBalancerResult<()> {
        match self.client.status(url).await {
            Ok(StatusCode::OK) => Ok(()),
            Ok(status) => Err(LoadBalancerError::ProbeFailure {
                url: url.to_string(),
                reason: format!("status {}", status),
            }),
            Err(e) => Err(LoadBalancerError::ProbeFailure {
                url: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
