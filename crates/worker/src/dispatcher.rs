//! Submission front door: validate, gate, charge, enqueue.
//!
//! Every rejection happens here, synchronously, before a job exists.
//! Nothing that fails admission ever reaches the queue or a sink.

use chrono::Utc;
use clair_core::job::JobKind;
use clair_core::prompt::validate_prompt;
use clair_core::quota::QuotaDecision;
use clair_core::safety::find_blocked_term;
use serde::Serialize;
use uuid::Uuid;

use crate::events::{JobEvent, JobEvents};
use crate::job::{Job, Requester};
use crate::ledger::QuotaLedger;
use crate::queue::{QueueClosed, TaskQueue};
use crate::sink::ResponseSink;
use crate::store::StoreError;

/// A request to run one job.
pub struct SubmitRequest {
    pub kind: JobKind,
    pub requester: Requester,
    pub prompt: String,
    pub attachment: Option<Vec<u8>>,
    pub sink: Box<dyn ResponseSink>,
}

/// Admission receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Queued {
    pub job_id: Uuid,
    /// 1-based place among waiting jobs at enqueue time.
    pub position: usize,
    pub quota: QuotaDecision,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("Subject matter restricted")]
    Unsafe,

    #[error("Daily {kind} limit reached ({limit}/{limit})")]
    QuotaExceeded { kind: JobKind, limit: i32 },

    #[error("Service is shutting down")]
    QueueClosed,

    #[error("Quota store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
}

impl From<QueueClosed> for SubmitError {
    fn from(_: QueueClosed) -> Self {
        Self::QueueClosed
    }
}

pub struct Dispatcher {
    ledger: QuotaLedger,
    queue: TaskQueue,
    events: JobEvents,
}

impl Dispatcher {
    pub fn new(ledger: QuotaLedger, queue: TaskQueue, events: JobEvents) -> Self {
        Self {
            ledger,
            queue,
            events,
        }
    }

    /// Jobs waiting behind the one in progress.
    pub fn backlog(&self) -> usize {
        self.queue.size()
    }

    pub fn events(&self) -> &JobEvents {
        &self.events
    }

    /// Admit a request and queue it for the worker.
    ///
    /// Checks run in order: empty prompt, safety gate, shutdown, quota.
    /// Quota is charged only for requests that passed the gate. A store
    /// failure rejects the request rather than admitting it uncounted.
    pub async fn submit(&self, request: SubmitRequest) -> Result<Queued, SubmitError> {
        let SubmitRequest {
            kind,
            requester,
            prompt,
            attachment,
            sink,
        } = request;

        let prompt = validate_prompt(&prompt)
            .map_err(|_| SubmitError::EmptyPrompt)?
            .to_string();

        if let Some(term) = find_blocked_term(&prompt) {
            tracing::info!(user_id = requester.user_id, %kind, term = %term, "Rejected restricted prompt");
            return Err(SubmitError::Unsafe);
        }

        if self.queue.is_closed() {
            return Err(SubmitError::QueueClosed);
        }

        let quota = self
            .ledger
            .check_and_consume(&requester, kind)
            .await
            .map_err(|e| {
                tracing::error!(user_id = requester.user_id, %kind, error = %e, "Quota check failed");
                SubmitError::StoreUnavailable(e)
            })?;
        if let QuotaDecision::Denied { limit } = quota {
            tracing::info!(user_id = requester.user_id, %kind, limit, "Daily limit reached");
            return Err(SubmitError::QuotaExceeded { kind, limit });
        }

        let job = Job {
            id: Uuid::now_v7(),
            kind,
            requester,
            prompt,
            attachment,
            enqueued_at: Utc::now(),
            sink,
        };
        let job_id = job.id;
        let user_id = job.requester.user_id;

        let position = self.queue.enqueue(job)?;
        self.events.publish(JobEvent::Queued {
            job_id,
            kind,
            position,
        });
        tracing::info!(%job_id, %kind, user_id, position, %quota, "Job queued");

        Ok(Queued {
            job_id,
            position,
            quota,
        })
    }
}
