//! Job submission over HTTP. Results are delivered to the caller's
//! webhook once the worker finishes.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use clair_core::job::JobKind;
use clair_core::types::{ChannelId, RoleId, UserId};
use clair_worker::dispatcher::{Dispatcher, Queued, SubmitRequest};
use clair_worker::job::Requester;
use clair_worker::sink::WebhookSink;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Largest accepted reference image.
const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// Upper bound on fetching a reference image, kept well inside the
/// request timeout.
const ATTACHMENT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub kind: JobKind,
    pub user_id: UserId,
    pub channel_id: ChannelId,
    #[serde(default)]
    pub role_ids: Vec<RoleId>,
    pub prompt: String,
    /// Receives the outcome as JSON (text, failure) or multipart (image).
    pub callback_url: String,
    /// Reference image for image jobs.
    pub attachment_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /jobs
///
/// Returns 202 with the job id, queue position, and quota status.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(body): Json<SubmitJobRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Queued>>)> {
    validate_http_url("callback_url", &body.callback_url)?;

    let attachment = match (&body.attachment_url, body.kind) {
        (Some(url), JobKind::Image) => Some(fetch_attachment(&state.http, url).await?),
        (Some(_), JobKind::Chat) => {
            tracing::debug!(user_id = body.user_id, "Ignoring attachment on chat job");
            None
        }
        (None, _) => None,
    };

    let sink = WebhookSink::new(state.http.clone(), body.callback_url);
    let queued = admit(
        Arc::clone(&state.dispatcher),
        SubmitRequest {
            kind: body.kind,
            requester: Requester {
                user_id: body.user_id,
                channel_id: body.channel_id,
                role_ids: body.role_ids,
            },
            prompt: body.prompt,
            attachment,
            sink: Box::new(sink),
        },
    )
    .await?;

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: queued })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Run admission on its own task.
///
/// Quota is charged before the job is enqueued. Dropping the handler
/// future (request timeout, client disconnect) must not cut between the
/// two, so the pair completes even if nobody waits for the answer.
async fn admit(dispatcher: Arc<Dispatcher>, request: SubmitRequest) -> AppResult<Queued> {
    tokio::spawn(async move { dispatcher.submit(request).await })
        .await
        .map_err(|e| AppError::InternalError(format!("Admission task failed: {e}")))?
        .map_err(AppError::from)
}

fn validate_http_url(field: &str, url: &str) -> Result<(), AppError> {
    match reqwest::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(AppError::BadRequest(format!("{field} must be an http(s) URL"))),
    }
}

async fn fetch_attachment(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, AppError> {
    validate_http_url("attachment_url", url)?;

    let mut response = client
        .get(url)
        .timeout(ATTACHMENT_FETCH_TIMEOUT)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| AppError::BadRequest(format!("Could not fetch attachment: {e}")))?;

    if response
        .content_length()
        .is_some_and(|len| len as usize > MAX_ATTACHMENT_BYTES)
    {
        return Err(AppError::BadRequest("Attachment is too large".to_string()));
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| AppError::BadRequest(format!("Could not read attachment: {e}")))?
    {
        if bytes.len() + chunk.len() > MAX_ATTACHMENT_BYTES {
            return Err(AppError::BadRequest("Attachment is too large".to_string()));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use axum::body::{Body, Bytes};
    use axum::routing::get;
    use axum::Router;
    use chrono::NaiveDate;
    use clair_core::quota::QuotaLimits;
    use clair_worker::events::JobEvents;
    use clair_worker::ledger::QuotaLedger;
    use clair_worker::queue::task_queue;
    use clair_worker::sink::ChannelSink;
    use clair_worker::store::{MemoryQuotaStore, QuotaStore, StoreError};

    use super::*;

    /// Serve `chunks` pieces of `chunk_len` bytes with chunked encoding.
    async fn serve_chunked(chunks: usize, chunk_len: usize) -> String {
        let app = Router::new().route(
            "/ref.png",
            get(move || async move {
                let pieces = (0..chunks)
                    .map(move |_| Ok::<_, std::io::Error>(Bytes::from(vec![0u8; chunk_len])));
                Body::from_stream(futures::stream::iter(pieces))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/ref.png")
    }

    #[tokio::test]
    async fn chunked_attachment_within_cap_is_read() {
        let url = serve_chunked(2, 1024 * 1024).await;
        let bytes = fetch_attachment(&reqwest::Client::new(), &url).await.unwrap();
        assert_eq!(bytes.len(), 2 * 1024 * 1024);
    }

    #[tokio::test]
    async fn chunked_attachment_over_cap_is_rejected() {
        let url = serve_chunked(11, 1024 * 1024).await;
        let result = fetch_attachment(&reqwest::Client::new(), &url).await;
        assert_matches!(result, Err(AppError::BadRequest(msg)) if msg.contains("too large"));
    }

    /// Quota store that takes a while to answer.
    struct SlowQuotaStore {
        inner: MemoryQuotaStore,
        delay: Duration,
    }

    #[async_trait]
    impl QuotaStore for SlowQuotaStore {
        async fn check_and_increment(
            &self,
            user_id: UserId,
            day: NaiveDate,
            kind: JobKind,
            limit: i32,
        ) -> Result<Option<i32>, StoreError> {
            tokio::time::sleep(self.delay).await;
            self.inner.check_and_increment(user_id, day, kind, limit).await
        }
    }

    #[tokio::test]
    async fn abandoned_request_still_enqueues_charged_job() {
        let store = Arc::new(SlowQuotaStore {
            inner: MemoryQuotaStore::new(),
            delay: Duration::from_millis(50),
        });
        let ledger = QuotaLedger::new(store, QuotaLimits::default(), Vec::new());
        let (queue, mut receiver) = task_queue();
        let dispatcher = Arc::new(Dispatcher::new(ledger, queue, JobEvents::default()));

        let (sink, _outcome) = ChannelSink::new();
        let request = SubmitRequest {
            kind: JobKind::Image,
            requester: Requester {
                user_id: 1,
                channel_id: 1,
                role_ids: Vec::new(),
            },
            prompt: "a fox".to_string(),
            attachment: None,
            sink: Box::new(sink),
        };

        let abandoned =
            tokio::time::timeout(Duration::from_millis(5), admit(dispatcher, request)).await;
        assert!(abandoned.is_err(), "caller gave up before admission finished");

        let job = tokio::time::timeout(Duration::from_secs(2), receiver.dequeue())
            .await
            .expect("charged job reaches the queue")
            .expect("queue still open");
        assert_eq!(job.prompt, "a fox");
    }

    #[test]
    fn callback_must_be_http() {
        assert!(validate_http_url("callback_url", "https://bot.local/hook").is_ok());
        assert_matches!(
            validate_http_url("callback_url", "ftp://bot.local/hook"),
            Err(AppError::BadRequest(_))
        );
        assert_matches!(
            validate_http_url("callback_url", "not a url"),
            Err(AppError::BadRequest(_))
        );
    }
}
