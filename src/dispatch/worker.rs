//! Worker pool draining the dispatch queue.
//!
//! # Responsibilities
//! - Run a fixed number of workers sharing one receiver
//! - Hand each task to a [`TaskHandler`] exactly once
//! - Stop on shutdown, or when the queue is closed and drained

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::dispatch::queue::{DispatchTask, TaskReceiver};
use crate::http::upstream::Upstream;
use crate::lifecycle::Shutdown;
use crate::load_balancer::{AffinityRouter, LoadBalancerError};
use crate::observability::metrics;

/// Processes one dequeued task. Failures are the handler's to log.
pub trait TaskHandler: Send + Sync + 'static {
    fn handle(&self, task: DispatchTask) -> impl Future<Output = ()> + Send;
}

/// Re-resolves the client's backend and forwards `backend.url + path`.
///
/// The response is discarded; only the outcome is logged. No retries.
#[derive(Clone)]
pub struct ForwardingHandler {
    router: AffinityRouter,
    upstream: Upstream,
}

impl ForwardingHandler {
    pub fn new(router: AffinityRouter, upstream: Upstream) -> Self {
        Self { router, upstream }
    }
}

impl TaskHandler for ForwardingHandler {
    async fn handle(&self, task: DispatchTask) {
        let Some(backend) = self.router.select(&task.client_id) else {
            tracing::error!(
                client = %task.client_id,
                path = %task.path,
                error = %LoadBalancerError::NoHealthyBackend,
                "Dropping dispatch task"
            );
            metrics::record_dispatch("no_backend");
            return;
        };

        let url = backend.url_for(&task.path);
        match self.upstream.get(&url).await {
            Ok(response) => {
                tracing::info!(client = %task.client_id, url = %url, status = %response.status, "Request forwarded");
                metrics::record_dispatch("forwarded");
            }
            Err(e) => {
                tracing::error!(client = %task.client_id, error = %e, "Error forwarding request");
                metrics::record_dispatch("failed");
            }
        }
    }
}

/// Handles to the running workers.
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers on the current runtime.
    pub fn spawn<H: TaskHandler>(
        size: usize,
        receiver: TaskReceiver,
        handler: Arc<H>,
        shutdown: &Shutdown,
    ) -> Self {
        let receiver = Arc::new(Mutex::new(receiver));
        let workers = (0..size)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    receiver.clone(),
                    handler.clone(),
                    shutdown.subscribe(),
                ))
            })
            .collect();

        tracing::info!(workers = size, "Dispatch workers started");
        Self { workers }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Wait for every worker to exit.
    pub async fn join(self) {
        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Dispatch worker panicked");
            }
        }
    }
}

async fn run_worker<H: TaskHandler>(
    id: usize,
    receiver: Arc<Mutex<TaskReceiver>>,
    handler: Arc<H>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        // Only the waiting worker holds the lock; it is released before the
        // task runs so others can dequeue concurrently.
        let next = tokio::select! {
            task = async { receiver.lock().await.recv().await } => task,
            _ = shutdown.recv() => {
                tracing::debug!(worker = id, "Dispatch worker received shutdown signal");
                break;
            }
        };

        match next {
            Some(task) => handler.handle(task).await,
            None => {
                tracing::debug!(worker = id, "Dispatch queue closed");
                break;
            }
        }
    }
}
