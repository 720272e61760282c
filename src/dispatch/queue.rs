//! FIFO queue of deferred forwards.

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

/// One request to be forwarded again, off the response path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTask {
    pub client_id: String,
    /// Path and query of the original request.
    pub path: String,
}

impl DispatchTask {
    pub fn new(client_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Bounded queue is at capacity; the new task was dropped.
    #[error("dispatch queue full ({0} tasks)")]
    QueueFull(usize),

    /// Every worker has stopped.
    #[error("dispatch queue closed")]
    Closed,
}

#[derive(Debug, Clone)]
enum QueueSender {
    Unbounded(mpsc::UnboundedSender<DispatchTask>),
    Bounded(mpsc::Sender<DispatchTask>, usize),
}

/// Producer side of the dispatch queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DispatchQueue {
    tx: QueueSender,
}

/// Consumer side of the dispatch queue, shared by the worker pool.
#[derive(Debug)]
pub enum TaskReceiver {
    Unbounded(mpsc::UnboundedReceiver<DispatchTask>),
    Bounded(mpsc::Receiver<DispatchTask>),
}

impl DispatchQueue {
    /// Create an unbounded queue.
    pub fn unbounded() -> (Self, TaskReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: QueueSender::Unbounded(tx) }, TaskReceiver::Unbounded(rx))
    }

    /// Create a queue holding at most `capacity` pending tasks.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn bounded(capacity: usize) -> (Self, TaskReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self { tx: QueueSender::Bounded(tx, capacity) },
            TaskReceiver::Bounded(rx),
        )
    }

    /// Unbounded when `capacity` is `None`.
    pub fn with_capacity(capacity: Option<usize>) -> (Self, TaskReceiver) {
        match capacity {
            Some(capacity) => Self::bounded(capacity),
            None => Self::unbounded(),
        }
    }

    /// Queue a task without waiting.
    ///
    /// An unbounded queue only fails once the receiver is gone.
    pub fn enqueue(&self, task: DispatchTask) -> Result<(), DispatchError> {
        match &self.tx {
            QueueSender::Unbounded(tx) => tx.send(task).map_err(|_| DispatchError::Closed),
            QueueSender::Bounded(tx, capacity) => tx.try_send(task).map_err(|e| match e {
                TrySendError::Full(_) => DispatchError::QueueFull(*capacity),
                TrySendError::Closed(_) => DispatchError::Closed,
            }),
        }
    }
}

impl TaskReceiver {
    /// Wait for the next task. `None` once all producers are dropped and
    /// the queue is drained.
    pub async fn recv(&mut self) -> Option<DispatchTask> {
        match self {
            TaskReceiver::Unbounded(rx) => rx.recv().await,
            TaskReceiver::Bounded(rx) => rx.recv().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let (queue, mut rx) = DispatchQueue::unbounded();
        for i in 0..10 {
            queue.enqueue(DispatchTask::new(format!("c{}", i % 3), format!("/{}", i))).unwrap();
        }
        drop(queue);

        let mut paths = Vec::new();
        while let Some(task) = rx.recv().await {
            paths.push(task.path);
        }
        let expected: Vec<_> = (0..10).map(|i| format!("/{}", i)).collect();
        assert_eq!(paths, expected);
    }

    #[test]
    fn test_bounded_rejects_when_full() {
        let (queue, _rx) = DispatchQueue::bounded(2);
        queue.enqueue(DispatchTask::new("a", "/")).unwrap();
        queue.enqueue(DispatchTask::new("a", "/")).unwrap();
        assert_eq!(
            queue.enqueue(DispatchTask::new("a", "/")),
            Err(DispatchError::QueueFull(2))
        );
    }

    #[test]
    fn test_closed_after_receiver_dropped() {
        let (queue, rx) = DispatchQueue::with_capacity(None);
        drop(rx);
        assert_eq!(queue.enqueue(DispatchTask::new("a", "/")), Err(DispatchError::Closed));
    }
}
