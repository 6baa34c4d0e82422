//! Running totals of finished jobs, fed from the worker's event channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clair_worker::events::JobEvent;
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Default)]
pub struct JobStats {
    completed: AtomicU64,
    failed: AtomicU64,
    mode_switches: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobStatsSnapshot {
    pub completed: u64,
    pub failed: u64,
    pub mode_switches: u64,
}

impl JobStats {
    pub fn record(&self, event: &JobEvent) {
        let counter = match event {
            JobEvent::Completed { .. } => &self.completed,
            JobEvent::Failed { .. } => &self.failed,
            JobEvent::ModeSwitched { .. } => &self.mode_switches,
            JobEvent::Queued { .. } | JobEvent::Started { .. } => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> JobStatsSnapshot {
        JobStatsSnapshot {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            mode_switches: self.mode_switches.load(Ordering::Relaxed),
        }
    }

    /// Consume events until the channel closes.
    pub async fn run(self: Arc<Self>, mut rx: broadcast::Receiver<JobEvent>) {
        loop {
            match rx.recv().await {
                Ok(event) => self.record(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Job stats lagged behind event channel");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use clair_core::job::JobKind;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn counts_terminal_events_only() {
        let stats = JobStats::default();
        let job_id = Uuid::nil();
        stats.record(&JobEvent::Started { job_id, kind: JobKind::Chat });
        stats.record(&JobEvent::Completed { job_id, kind: JobKind::Chat, elapsed_ms: 5 });
        stats.record(&JobEvent::Failed { job_id, kind: JobKind::Image, reason: "x".into() });

        let snap = stats.snapshot();
        assert_eq!(snap.completed, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.mode_switches, 0);
    }
}
