//! Unbounded FIFO between the intake and the single dispatch worker.
//!
//! [`task_queue`] returns a cloneable producer and the one consumer.
//! Closing happens on the consumer side: once closed, further enqueues
//! fail while jobs already queued can still be drained.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::job::Job;

#[derive(Debug, thiserror::Error)]
#[error("Queue is closed")]
pub struct QueueClosed;

/// Producer handle.
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<Job>,
    backlog: Arc<AtomicUsize>,
}

/// Consumer handle. There is exactly one.
pub struct QueueReceiver {
    rx: mpsc::UnboundedReceiver<Job>,
    backlog: Arc<AtomicUsize>,
}

pub fn task_queue() -> (TaskQueue, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let backlog = Arc::new(AtomicUsize::new(0));
    (
        TaskQueue {
            tx,
            backlog: backlog.clone(),
        },
        QueueReceiver { rx, backlog },
    )
}

impl TaskQueue {
    /// Append a job and return its 1-based position among waiting jobs.
    ///
    /// On failure the job is dropped; its sink is never invoked.
    pub fn enqueue(&self, job: Job) -> Result<usize, QueueClosed> {
        let position = self.backlog.fetch_add(1, Ordering::SeqCst) + 1;
        if self.tx.send(job).is_err() {
            self.backlog.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueClosed);
        }
        Ok(position)
    }

    /// Jobs waiting, not counting the one being executed.
    pub fn size(&self) -> usize {
        self.backlog.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl QueueReceiver {
    /// Next job in arrival order. Waits while empty; returns `None` once
    /// the queue is closed and drained.
    pub async fn dequeue(&mut self) -> Option<Job> {
        let job = self.rx.recv().await?;
        self.backlog.fetch_sub(1, Ordering::SeqCst);
        Some(job)
    }

    /// Reject further enqueues. Queued jobs remain available.
    pub fn close(&mut self) {
        self.rx.close();
    }

    pub fn size(&self) -> usize {
        self.backlog.load(Ordering::SeqCst)
    }
}
