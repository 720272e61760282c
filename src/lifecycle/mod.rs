//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (binary):
//!     Load config → Validate → Build pool/router/queue → Start workers,
//!     health monitor → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → Shutdown::trigger → server drains, monitor and workers exit
//! ```
//!
//! # Design Decisions
//! - Every background task takes a shutdown receiver; none run until process exit
//! - Tasks already queued when shutdown fires are abandoned

pub mod shutdown;

pub use shutdown::Shutdown;
