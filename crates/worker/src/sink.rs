//! Where a job's outcome goes.
//!
//! [`ResponseSink::deliver`] consumes the boxed sink, so a job can report
//! at most once; the worker guarantees it reports at least once.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::job::JobReceipt;

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single delivery attempt.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Encoded image ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Chat reply, already cleaned and truncated.
    Text(String),
    Image(RenderedImage),
    /// Human-readable failure reason.
    Failed(String),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    fn status(&self) -> &'static str {
        if self.is_success() {
            "completed"
        } else {
            "failed"
        }
    }
}

// ---------------------------------------------------------------------------
// Sink trait
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),

    /// The in-process receiver was dropped before the outcome arrived.
    #[error("Outcome receiver dropped")]
    ReceiverGone,
}

#[async_trait]
pub trait ResponseSink: Send + Sync {
    async fn deliver(self: Box<Self>, receipt: &JobReceipt, outcome: JobOutcome)
        -> Result<(), SinkError>;
}

// ---------------------------------------------------------------------------
// ChannelSink
// ---------------------------------------------------------------------------

/// Hands the outcome to an in-process awaiting caller.
pub struct ChannelSink {
    tx: oneshot::Sender<JobOutcome>,
}

impl ChannelSink {
    pub fn new() -> (Self, oneshot::Receiver<JobOutcome>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ResponseSink for ChannelSink {
    async fn deliver(
        self: Box<Self>,
        _receipt: &JobReceipt,
        outcome: JobOutcome,
    ) -> Result<(), SinkError> {
        self.tx.send(outcome).map_err(|_| SinkError::ReceiverGone)
    }
}

// ---------------------------------------------------------------------------
// WebhookSink
// ---------------------------------------------------------------------------

/// Build the HTTP client shared by all webhook sinks.
pub fn webhook_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build()
}

/// Posts the outcome to a caller-supplied URL.
///
/// Text replies and failures go as JSON. Images go as multipart with a
/// `metadata` JSON part and an `image` file part. Failed attempts are
/// retried with exponential backoff before giving up.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, receipt: &JobReceipt, outcome: &JobOutcome) -> Result<(), SinkError> {
        let metadata = metadata(receipt, outcome);
        let request = match outcome {
            JobOutcome::Image(image) => {
                let part = reqwest::multipart::Part::bytes(image.bytes.clone())
                    .file_name(image.file_name.clone())
                    .mime_str(image.content_type)?;
                let form = reqwest::multipart::Form::new()
                    .text("metadata", metadata.to_string())
                    .part("image", part);
                self.client.post(&self.url).multipart(form)
            }
            JobOutcome::Text(_) | JobOutcome::Failed(_) => self.client.post(&self.url).json(&metadata),
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SinkError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl ResponseSink for WebhookSink {
    async fn deliver(
        self: Box<Self>,
        receipt: &JobReceipt,
        outcome: JobOutcome,
    ) -> Result<(), SinkError> {
        let url = self.url.as_str();
        for (attempt, delay_secs) in RETRY_DELAYS_SECS.iter().enumerate() {
            match self.try_send(receipt, &outcome).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url,
                        job_id = %receipt.job_id,
                        error = %e,
                        "Webhook delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
                }
            }
        }

        // Final attempt after the last backoff.
        self.try_send(receipt, &outcome).await.inspect_err(|e| {
            tracing::error!(url, job_id = %receipt.job_id, error = %e, "Webhook delivery failed after all retries");
        })
    }
}

/// JSON body (or multipart metadata part) describing the outcome.
fn metadata(receipt: &JobReceipt, outcome: &JobOutcome) -> serde_json::Value {
    let mut body = serde_json::json!({
        "job_id": receipt.job_id,
        "kind": receipt.kind,
        "user_id": receipt.user_id,
        "channel_id": receipt.channel_id,
        "status": outcome.status(),
    });
    match outcome {
        JobOutcome::Text(text) => body["text"] = serde_json::Value::String(text.clone()),
        JobOutcome::Image(image) => {
            body["file_name"] = serde_json::Value::String(image.file_name.clone())
        }
        JobOutcome::Failed(reason) => body["reason"] = serde_json::Value::String(reason.clone()),
    }
    body
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
