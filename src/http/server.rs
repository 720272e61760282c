//! HTTP server setup and the balancer front end.
//!
//! # Responsibilities
//! - Create the Axum Router and wire middleware (tracing, timeout, request ID)
//! - Derive the client identity from the peer address
//! - Forward synchronously to the selected backend and relay the result
//! - Enqueue every request for asynchronous forwarding
//! - Own the background tasks (health monitor, dispatch workers)

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::BalancerConfig;
use crate::dispatch::{DispatchQueue, DispatchTask, ForwardingHandler, TaskReceiver, WorkerPool};
use crate::health::HealthMonitor;
use crate::http::upstream::Upstream;
use crate::lifecycle::Shutdown;
use crate::load_balancer::{AffinityRouter, BackendPool, LoadBalancerError};
use crate::observability::metrics;
use crate::security::{rate_limit_middleware, RateLimiter};

/// Per-request balancing logic, composed from injected parts.
#[derive(Clone)]
pub struct FrontEnd {
    router: AffinityRouter,
    upstream: Upstream,
    queue: DispatchQueue,
}

impl FrontEnd {
    pub fn new(router: AffinityRouter, upstream: Upstream, queue: DispatchQueue) -> Self {
        Self {
            router,
            upstream,
            queue,
        }
    }

    /// Serve one GET from `client_id` for `path`.
    ///
    /// The request is always queued for asynchronous forwarding. The
    /// synchronous forward goes to the backend's base URL; `path` is not
    /// appended there.
    pub async fn handle(&self, client_id: &str, path: &str) -> Response {
        let selected = self.router.select(client_id);

        if let Err(e) = self.queue.enqueue(DispatchTask::new(client_id, path)) {
            tracing::warn!(client = %client_id, path = %path, error = %e, "Async forward not queued");
            metrics::record_dispatch("rejected");
        }

        let Some(backend) = selected else {
            let err = LoadBalancerError::NoHealthyBackend;
            tracing::error!(client = %client_id, error = %err, "No healthy backend servers available");
            return (err.status_code(), "Service Unavailable").into_response();
        };

        match self.upstream.get(&backend.url).await {
            Ok(response) => {
                tracing::debug!(
                    client = %client_id,
                    backend = %backend.url,
                    status = %response.status,
                    "Relaying backend response"
                );
                (response.status, response.body).into_response()
            }
            Err(e @ LoadBalancerError::ResponseTooLarge { .. }) => {
                tracing::warn!(client = %client_id, error = %e, "Backend response over body size cap");
                (e.status_code(), "Bad Gateway").into_response()
            }
            Err(e) => {
                tracing::error!(client = %client_id, error = %e, "Error forwarding request");
                (e.status_code(), "Bad Gateway").into_response()
            }
        }
    }
}

/// Axum entry point: extract inputs and delegate to [`FrontEnd::handle`].
async fn balance_handler(
    State(front): State<FrontEnd>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let client_id = addr.ip().to_string();
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    tracing::debug!(request_id = %request_id, client = %client_id, path = %path, "Balancing request");

    let response = front.handle(&client_id, &path).await;
    metrics::record_request(response.status().as_u16(), start_time);
    response
}

/// HTTP server for the load balancer.
pub struct BalancerServer {
    router: Router,
    config: BalancerConfig,
    pool: Arc<BackendPool>,
    affinity: AffinityRouter,
    upstream: Upstream,
    tasks: TaskReceiver,
}

impl BalancerServer {
    /// Build every component from configuration. Nothing runs until [`run`](Self::run).
    pub fn new(config: BalancerConfig) -> Self {
        let pool = Arc::new(BackendPool::new(config.backends.iter().cloned()));
        let affinity = AffinityRouter::new(pool.clone());
        let upstream = Upstream::new(
            Duration::from_secs(config.timeouts.upstream_secs),
            config.limits.max_body_bytes,
        );
        let (queue, tasks) = DispatchQueue::with_capacity(config.dispatch.queue_capacity);

        let front = FrontEnd::new(affinity.clone(), upstream.clone(), queue);
        let router = Self::build_router(&config, front);

        Self {
            router,
            config,
            pool,
            affinity,
            upstream,
            tasks,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &BalancerConfig, front: FrontEnd) -> Router {
        let mut router = Router::new()
            .route("/", get(balance_handler))
            .route("/{*path}", get(balance_handler))
            .with_state(front);

        if config.rate_limit.enabled {
            let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
            router = router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        router
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Shared pool handle, e.g. for inspecting or forcing health state.
    pub fn pool(&self) -> Arc<BackendPool> {
        self.pool.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.pool.len(),
            "Load balancer starting"
        );

        let monitor = HealthMonitor::new(self.pool.clone(), self.config.health_check.clone());
        let monitor_task = tokio::spawn(monitor.run(shutdown.subscribe()));

        let handler = Arc::new(ForwardingHandler::new(self.affinity.clone(), self.upstream.clone()));
        let workers = WorkerPool::spawn(
            self.config.dispatch.worker_count(),
            self.tasks,
            handler,
            &shutdown,
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let mut stop = shutdown.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        // The server only returns once shutdown fired; let the rest wind down.
        shutdown.trigger();
        workers.join().await;
        if let Err(e) = monitor_task.await {
            tracing::error!(error = %e, "Health monitor task failed");
        }

        tracing::info!("Load balancer stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }
}
