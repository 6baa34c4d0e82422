//! Admitted units of work.

use clair_core::job::JobKind;
use clair_core::types::{ChannelId, RoleId, Timestamp, UserId};
use serde::Serialize;
use uuid::Uuid;

use crate::sink::ResponseSink;

/// Who asked, and where the answer goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requester {
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub role_ids: Vec<RoleId>,
}

/// Identity of a job, handed to its sink together with the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReceipt {
    pub job_id: Uuid,
    pub kind: JobKind,
    pub user_id: UserId,
    pub channel_id: ChannelId,
}

/// A job that passed the safety gate and the quota ledger.
///
/// Owns its sink; the worker moves it out and calls it exactly once.
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    pub requester: Requester,
    /// Trimmed, non-empty.
    pub prompt: String,
    /// Reference image for image jobs. Ignored for chat jobs.
    pub attachment: Option<Vec<u8>>,
    pub enqueued_at: Timestamp,
    pub sink: Box<dyn ResponseSink>,
}

impl Job {
    pub fn receipt(&self) -> JobReceipt {
        JobReceipt {
            job_id: self.id,
            kind: self.kind,
            user_id: self.requester.user_id,
            channel_id: self.requester.channel_id,
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("requester", &self.requester)
            .field("prompt_len", &self.prompt.len())
            .field("has_attachment", &self.attachment.is_some())
            .field("enqueued_at", &self.enqueued_at)
            .finish_non_exhaustive()
    }
}
