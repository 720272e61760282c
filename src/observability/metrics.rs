//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_requests_total` (counter): client responses by status
//! - `lb_request_duration_seconds` (histogram): front-end latency
//! - `lb_backend_health` (gauge): 1=healthy, 0=unhealthy
//! - `lb_dispatch_tasks_total` (counter): async forwards by outcome
//! - `lb_rate_limited_total` (counter): requests rejected by the limiter
//!
//! Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, start: Instant) {
    counter!("lb_requests_total", "status" => status.to_string()).increment(1);
    histogram!("lb_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_backend_health(backend: &str, healthy: bool) {
    gauge!("lb_backend_health", "backend" => backend.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

/// `outcome` is one of "forwarded", "failed", "no_backend", "rejected".
pub fn record_dispatch(outcome: &'static str) {
    counter!("lb_dispatch_tasks_total", "outcome" => outcome).increment(1);
}

pub fn record_rate_limited() {
    counter!("lb_rate_limited_total").increment(1);
}
