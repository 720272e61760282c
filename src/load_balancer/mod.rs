//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Client identifier (remote IP)
//!     → pool.rs (healthy snapshot, taken under the pool lock)
//!     → affinity.rs (hash(client) % snapshot.len())
//!     → backend.rs (selected backend, or none → 503)
//! ```
//!
//! # Design Decisions
//! - Pool membership is fixed at startup; only health flags change
//! - One lock covers the whole pool so a snapshot never observes a partial update
//! - Unhealthy backends excluded from selection

pub mod affinity;
pub mod backend;
pub mod error;
pub mod pool;

pub use affinity::AffinityRouter;
pub use backend::Backend;
pub use error::{LoadBalancerError, LoadBalancerResult};
pub use pool::BackendPool;
