//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, client id = peer IP)
//!     → AffinityRouter picks a backend
//!     → upstream.rs (GET backend base URL, full body)
//!     → status + body relayed to client (502 / 503 on failure)
//!     → DispatchQueue (same request, forwarded again later)
//! ```

pub mod backend_service;
pub mod server;
pub mod upstream;

pub use server::{BalancerServer, FrontEnd};
pub use upstream::{Upstream, UpstreamResponse};
