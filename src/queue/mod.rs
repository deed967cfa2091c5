//! Job queue contract.
//!
//! The durable queue/worker-pool runtime is an external collaborator; this
//! module defines only the submission surface the broadcaster needs —
//! submit now and submit after a delay — plus an in-memory implementation
//! that captures submissions for tests and local development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::types::Result;

// =============================================================================
// JobQueue
// =============================================================================

/// Submission surface of the background job runtime.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Submit a payload for execution as soon as possible.
    async fn enqueue(&self, queue: &str, payload: Vec<u8>) -> Result<()>;

    /// Submit a payload for execution after `delay`.
    async fn enqueue_in(&self, queue: &str, delay: Duration, payload: Vec<u8>) -> Result<()>;
}

impl std::fmt::Debug for dyn JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JobQueue")
    }
}

// =============================================================================
// InMemoryJobQueue
// =============================================================================

/// One captured submission.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub queue: String,

    /// `None` for immediate submissions, the requested delay otherwise.
    pub delay: Option<Duration>,

    pub payload: Vec<u8>,
}

/// Capturing queue for tests: records every submission per queue name
/// instead of executing anything.
#[derive(Debug, Default)]
pub struct InMemoryJobQueue {
    jobs: Mutex<HashMap<String, Vec<QueuedJob>>>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// All submissions captured for `queue`, in submission order.
    pub async fn jobs(&self, queue: &str) -> Vec<QueuedJob> {
        self.jobs.lock().await.get(queue).cloned().unwrap_or_default()
    }

    /// Number of submissions captured for `queue`.
    pub async fn len(&self, queue: &str) -> usize {
        self.jobs.lock().await.get(queue).map(|v| v.len()).unwrap_or(0)
    }

    /// Whether nothing has been captured for `queue`.
    pub async fn is_empty(&self, queue: &str) -> bool {
        self.len(queue).await == 0
    }

    /// Number of delayed submissions captured for `queue`.
    pub async fn scheduled_len(&self, queue: &str) -> usize {
        self.jobs
            .lock()
            .await
            .get(queue)
            .map(|v| v.iter().filter(|j| j.delay.is_some()).count())
            .unwrap_or(0)
    }

    /// Drop all captured submissions.
    pub async fn clear(&self) {
        self.jobs.lock().await.clear();
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, queue: &str, payload: Vec<u8>) -> Result<()> {
        let job = QueuedJob {
            queue: queue.to_string(),
            delay: None,
            payload,
        };
        self.jobs.lock().await.entry(queue.to_string()).or_default().push(job);
        tracing::debug!(queue, "captured immediate submission");
        Ok(())
    }

    async fn enqueue_in(&self, queue: &str, delay: Duration, payload: Vec<u8>) -> Result<()> {
        let job = QueuedJob {
            queue: queue.to_string(),
            delay: Some(delay),
            payload,
        };
        self.jobs.lock().await.entry(queue.to_string()).or_default().push(job);
        tracing::debug!(queue, delay_secs = delay.as_secs(), "captured delayed submission");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_immediate_and_delayed_separately() {
        let queue = InMemoryJobQueue::new();
        queue.enqueue("default", b"a".to_vec()).await.unwrap();
        queue
            .enqueue_in("default", Duration::from_secs(5), b"b".to_vec())
            .await
            .unwrap();

        assert_eq!(queue.len("default").await, 2);
        assert_eq!(queue.scheduled_len("default").await, 1);

        let jobs = queue.jobs("default").await;
        assert_eq!(jobs[0].delay, None);
        assert_eq!(jobs[1].delay, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn queues_are_independent() {
        let queue = InMemoryJobQueue::new();
        queue.enqueue("mailers", b"a".to_vec()).await.unwrap();

        assert_eq!(queue.len("mailers").await, 1);
        assert!(queue.is_empty("default").await);

        queue.clear().await;
        assert!(queue.is_empty("mailers").await);
    }
}
