//! Minimal backend service for local demos and tests.
//!
//! Serves a fixed body on `/`, behind the per-client rate limiter.

use axum::{middleware, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::lifecycle::Shutdown;
use crate::security::{rate_limit_middleware, RateLimiter};

/// Body returned by the backend's `/` route.
pub const BACKEND_RESPONSE: &str = "Response from secure server";

async fn home() -> &'static str {
    BACKEND_RESPONSE
}

/// Router for the backend service.
pub fn backend_router(limiter: Arc<RateLimiter>) -> Router {
    Router::new()
        .route("/", get(home))
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Serve the backend on `listener` until `shutdown` fires.
pub async fn serve_backend(
    listener: TcpListener,
    limiter: Arc<RateLimiter>,
    shutdown: Shutdown,
) -> Result<(), std::io::Error> {
    tracing::info!(address = %listener.local_addr()?, "Backend server starting");

    let app = backend_router(limiter).into_make_service_with_connect_info::<SocketAddr>();
    let mut stop = shutdown.subscribe();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = stop.recv().await;
        })
        .await?;

    tracing::info!("Backend server stopped");
    Ok(())
}
