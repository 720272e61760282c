//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-IP sliding window; 429 when exceeded)
//!     → wrapped handler
//! ```
//!
//! # Design Decisions
//! - Client identity is the peer address, never a request header
//! - The limiter is a standalone component; wiring it in front of a
//!   handler is a per-service policy choice

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimiter};
