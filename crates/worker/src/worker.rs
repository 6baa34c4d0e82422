//! The single consumer of the task queue.
//!
//! One job at a time: make the right model family resident, call the
//! backend, deliver the outcome, repeat. A job's failure is reported
//! through its own sink and never stops the loop.

use std::sync::Arc;
use std::time::Instant;

use clair_core::job::JobKind;
use clair_core::prompt::{augment_negative, augment_positive};
use clair_core::reply::{clean_reply, truncate_chars, MAX_REPLY_CHARS};
use tokio_util::sync::CancellationToken;

use crate::arbiter::{ArbiterError, ResourceArbiter, Transition};
use crate::backend::{BackendError, ChatBackend, ImageBackend};
use crate::config::WorkerConfig;
use crate::context::build_conversation;
use crate::events::{JobEvent, JobEvents};
use crate::job::Job;
use crate::queue::QueueReceiver;
use crate::render::render_for_delivery;
use crate::sink::JobOutcome;
use crate::store::ContextStore;

/// Why an admitted job produced no result. The message is shown to the
/// requester.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Arbiter(#[from] ArbiterError),

    #[error("Backend call failed: {0}")]
    Backend(#[from] BackendError),

    #[error("Image generation finished without an image")]
    NoImage,

    #[error("The model returned an empty reply")]
    EmptyReply,
}

pub struct DispatchWorker {
    arbiter: Arc<ResourceArbiter>,
    chat: Arc<dyn ChatBackend>,
    image: Arc<dyn ImageBackend>,
    context: Arc<dyn ContextStore>,
    events: JobEvents,
    context_turns: usize,
    persona: String,
    negative: String,
}

impl DispatchWorker {
    pub fn new(
        arbiter: Arc<ResourceArbiter>,
        chat: Arc<dyn ChatBackend>,
        image: Arc<dyn ImageBackend>,
        context: Arc<dyn ContextStore>,
        events: JobEvents,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            arbiter,
            chat,
            image,
            context,
            events,
            context_turns: config.context_turns,
            persona: config.persona.clone(),
            negative: augment_negative(&config.negative_base),
        }
    }

    /// Run until the queue is closed and drained.
    ///
    /// Cancellation closes the queue; jobs already admitted still run.
    /// On exit the accelerator is released back to `Idle`.
    pub async fn run(self, mut queue: QueueReceiver, cancel: CancellationToken) {
        tracing::info!("Dispatch worker started");
        let mut closing = false;

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled(), if !closing => {
                    tracing::info!(backlog = queue.size(), "Dispatch worker draining queue");
                    queue.close();
                    closing = true;
                    continue;
                }
                job = queue.dequeue() => job,
            };

            let Some(job) = next else { break };
            self.process(job).await;
        }

        if let Err(e) = self.arbiter.release().await {
            tracing::error!(error = %e, "Failed to release accelerator on shutdown");
        }
        tracing::info!("Dispatch worker stopped");
    }

    async fn process(&self, job: Job) {
        let receipt = job.receipt();
        let started = Instant::now();
        self.events.publish(JobEvent::Started {
            job_id: receipt.job_id,
            kind: receipt.kind,
        });
        tracing::info!(
            job_id = %receipt.job_id,
            kind = %receipt.kind,
            user_id = receipt.user_id,
            waited_ms = (chrono::Utc::now() - job.enqueued_at).num_milliseconds(),
            "Job started",
        );

        let outcome = match self.execute(&job).await {
            Ok(outcome) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                self.events.publish(JobEvent::Completed {
                    job_id: receipt.job_id,
                    kind: receipt.kind,
                    elapsed_ms,
                });
                tracing::info!(job_id = %receipt.job_id, elapsed_ms, "Job completed");
                outcome
            }
            Err(e) => {
                let reason = e.to_string();
                self.events.publish(JobEvent::Failed {
                    job_id: receipt.job_id,
                    kind: receipt.kind,
                    reason: reason.clone(),
                });
                tracing::warn!(job_id = %receipt.job_id, error = %reason, "Job failed");
                JobOutcome::Failed(reason)
            }
        };

        if let Err(e) = job.sink.deliver(&receipt, outcome).await {
            tracing::error!(job_id = %receipt.job_id, error = %e, "Failed to deliver job outcome");
        }
    }

    async fn execute(&self, job: &Job) -> Result<JobOutcome, JobError> {
        if let Transition::Switched { from, to } =
            self.arbiter.transition(job.kind.required_state()).await?
        {
            self.events.publish(JobEvent::ModeSwitched { from, to });
        }

        match job.kind {
            JobKind::Chat => self.run_chat(job).await,
            JobKind::Image => self.run_image(job).await,
        }
    }

    async fn run_chat(&self, job: &Job) -> Result<JobOutcome, JobError> {
        let channel_id = job.requester.channel_id;

        let history = match self.context.recent(channel_id, self.context_turns).await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(channel_id, error = %e, "Conversation history unavailable, continuing without it");
                Vec::new()
            }
        };
        let messages = build_conversation(&self.persona, history, &job.prompt);

        let raw = self.chat.chat(&messages).await?;
        let reply = clean_reply(&raw);
        if reply.is_empty() {
            return Err(JobError::EmptyReply);
        }

        if let Err(e) = self
            .context
            .append_exchange(channel_id, &job.prompt, &reply)
            .await
        {
            tracing::warn!(channel_id, error = %e, "Failed to record conversation turn");
        }

        Ok(JobOutcome::Text(truncate_chars(&reply, MAX_REPLY_CHARS).to_string()))
    }

    async fn run_image(&self, job: &Job) -> Result<JobOutcome, JobError> {
        let positive = augment_positive(&job.prompt);
        let raw = self
            .image
            .generate(&positive, &self.negative, job.attachment.as_deref())
            .await?
            .ok_or(JobError::NoImage)?;
        Ok(JobOutcome::Image(render_for_delivery(raw)))
    }
}
