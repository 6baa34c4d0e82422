//! One-shot image generation against a ComfyUI instance.
//!
//! [`ImageGenerator::generate`] hides ComfyUI's asynchronous protocol:
//! open a WebSocket under a fresh client id, submit the rendered
//! workflow, wait for the prompt's completion frame, then fetch the
//! first output image from the history endpoint.

use std::time::Duration;

use futures::StreamExt;
use rand::Rng;
use tokio_tungstenite::tungstenite::Message;

use crate::api::{ComfyUIApi, ComfyUIApiError};
use crate::client::{ComfyUIClient, ComfyUIClientError, ComfyUIStream};
use crate::history::first_image;
use crate::messages::{parse_message, ComfyUIMessage};
use crate::workflow::{WorkflowError, WorkflowInputs, WorkflowTemplate};

/// Default upper bound on waiting for a single prompt to finish.
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(600);

/// Sampler seeds are drawn from `1..=MAX_SEED`.
const MAX_SEED: u64 = 1_000_000_000;

/// Errors from a generation attempt.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Client(#[from] ComfyUIClientError),

    #[error(transparent)]
    Api(#[from] ComfyUIApiError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// ComfyUI reported an execution error for our prompt.
    #[error("ComfyUI execution failed: {0}")]
    Execution(String),

    /// The WebSocket closed before the prompt finished.
    #[error("ComfyUI connection closed before prompt {0} finished")]
    ConnectionClosed(String),

    #[error("Timed out after {0:?} waiting for ComfyUI")]
    Timeout(Duration),
}

/// Generates images from a fixed workflow template.
pub struct ImageGenerator {
    client: ComfyUIClient,
    api: ComfyUIApi,
    template: WorkflowTemplate,
    completion_timeout: Duration,
}

impl ImageGenerator {
    pub fn new(
        client: ComfyUIClient,
        api: ComfyUIApi,
        template: WorkflowTemplate,
        completion_timeout: Duration,
    ) -> Self {
        Self {
            client,
            api,
            template,
            completion_timeout,
        }
    }

    /// Render, submit, and await one image.
    ///
    /// Returns `Ok(None)` when the prompt finished without producing an
    /// image. An `attachment` is uploaded and wired into the template's
    /// LoadImage node; templates without one ignore it.
    pub async fn generate(
        &self,
        positive: &str,
        negative: &str,
        attachment: Option<&[u8]>,
    ) -> Result<Option<Vec<u8>>, GenerateError> {
        // Connect first so the completion frame cannot be missed.
        let mut conn = self.client.connect().await?;

        let uploaded = match attachment {
            Some(bytes) if self.template.accepts_image() => {
                let name = format!("clair_{}.png", uuid::Uuid::new_v4());
                Some(self.api.upload_image(bytes.to_vec(), &name).await?.name)
            }
            Some(_) => {
                tracing::warn!("Workflow has no LoadImage node, ignoring attachment");
                None
            }
            None => None,
        };

        let seed = rand::rng().random_range(1..=MAX_SEED);
        let workflow = self.template.render(&WorkflowInputs {
            positive,
            negative,
            seed,
            image_name: uploaded.as_deref(),
        })?;

        let submitted = self.api.submit_workflow(&workflow, &conn.client_id).await?;
        tracing::info!(
            prompt_id = %submitted.prompt_id,
            comfy_queue_position = submitted.number,
            seed,
            "Workflow submitted to ComfyUI",
        );

        tokio::time::timeout(
            self.completion_timeout,
            wait_for_completion(&mut conn.ws_stream, &submitted.prompt_id),
        )
        .await
        .map_err(|_| GenerateError::Timeout(self.completion_timeout))??;

        let _ = conn.ws_stream.close(None).await;

        let history = self.api.get_history(&submitted.prompt_id).await?;
        match first_image(&history, &submitted.prompt_id) {
            Some(image) => Ok(Some(self.api.view_image(&image).await?)),
            None => {
                tracing::warn!(prompt_id = %submitted.prompt_id, "Prompt produced no image");
                Ok(None)
            }
        }
    }
}

/// Read frames until `prompt_id` completes or fails.
async fn wait_for_completion(ws: &mut ComfyUIStream, prompt_id: &str) -> Result<(), GenerateError> {
    while let Some(frame) = ws.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            // Binary frames are sampler previews.
            Ok(_) => continue,
            Err(e) => {
                return Err(ComfyUIClientError::Protocol(e.to_string()).into());
            }
        };

        match parse_message(&text) {
            Ok(ComfyUIMessage::Executing(data)) if data.is_completion_of(prompt_id) => {
                tracing::debug!(prompt_id, "Execution completed");
                return Ok(());
            }
            Ok(ComfyUIMessage::ExecutionError(err)) if err.prompt_id == prompt_id => {
                return Err(GenerateError::Execution(format!(
                    "{}: {}",
                    err.exception_type, err.exception_message
                )));
            }
            Ok(ComfyUIMessage::ExecutionInterrupted(data)) if data.prompt_id == prompt_id => {
                return Err(GenerateError::Execution("execution interrupted".to_string()));
            }
            Ok(ComfyUIMessage::Progress(p)) => {
                tracing::trace!(prompt_id, value = p.value, max = p.max, "Generation progress");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, raw_message = %text, "Failed to parse ComfyUI message");
            }
        }
    }
    Err(GenerateError::ConnectionClosed(prompt_id.to_string()))
}
