//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer (fixed interval, no jitter)
//!     → GET each backend's base URL, in pool order
//!     → 200 → healthy, anything else → unhealthy
//!     → BackendPool::set_health
//! ```
//!
//! # Design Decisions
//! - A single probe result decides the state; there is no hysteresis
//! - Probe failures are logged and recorded, never escalated
//! - Each probe is bounded by a timeout so one slow backend cannot stall the loop

pub mod active;

pub use active::HealthMonitor;
