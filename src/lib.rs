//! Sticky HTTP load balancer library.

pub mod config;
pub mod dispatch;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod security;

pub use config::schema::BalancerConfig;
pub use http::BalancerServer;
pub use lifecycle::Shutdown;
