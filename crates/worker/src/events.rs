//! Lifecycle events for queued jobs, fanned out over a broadcast channel.

use clair_core::accelerator::AcceleratorState;
use clair_core::job::JobKind;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    Queued {
        job_id: Uuid,
        kind: JobKind,
        position: usize,
    },
    Started {
        job_id: Uuid,
        kind: JobKind,
    },
    ModeSwitched {
        from: AcceleratorState,
        to: AcceleratorState,
    },
    Completed {
        job_id: Uuid,
        kind: JobKind,
        elapsed_ms: u64,
    },
    Failed {
        job_id: Uuid,
        kind: JobKind,
        reason: String,
    },
}

/// Cloneable publish handle. Events with no subscriber are dropped.
#[derive(Clone)]
pub struct JobEvents {
    sender: broadcast::Sender<JobEvent>,
}

impl JobEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: JobEvent) {
        // Only fails when nobody is subscribed.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}

impl Default for JobEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
