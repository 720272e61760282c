//! Asynchronous dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Front end (every request)
//!     → queue.rs (DispatchQueue::enqueue, never waits)
//!     → worker.rs (N workers, shared receiver, FIFO across all clients)
//!     → AffinityRouter::select (re-resolved at dispatch time)
//!     → GET backend.url + path, result logged and discarded
//! ```
//!
//! # Design Decisions
//! - Unbounded by default; an optional capacity turns overflow into `QueueFull`
//! - No retries, no cancellation of in-flight forwards
//! - No ordering relative to the synchronous response already sent

pub mod queue;
pub mod worker;

pub use queue::{DispatchError, DispatchQueue, DispatchTask, TaskReceiver};
pub use worker::{ForwardingHandler, TaskHandler, WorkerPool};
