//! Seams between the worker and the two inference backends.
//!
//! The arbiter only needs [`TextModelControl`]; the dispatcher needs
//! [`ChatBackend`] and [`ImageBackend`]. Production wiring uses the
//! Ollama and ComfyUI clients; tests substitute recording fakes.

use async_trait::async_trait;
use clair_comfyui::{GenerateError, ImageGenerator};
use clair_core::chat::ChatMessage;
use clair_ollama::{OllamaClient, OllamaError};

/// Failure of a single backend call.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("text backend: {0}")]
    Ollama(#[from] OllamaError),

    #[error("image backend: {0}")]
    ComfyUI(#[from] GenerateError),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Load/unload control over the text model's accelerator residency.
#[async_trait]
pub trait TextModelControl: Send + Sync {
    /// Bring the text model into accelerator memory.
    async fn load(&self) -> Result<(), BackendError>;

    /// Release the text model's accelerator memory. Must not return
    /// `Ok` before the backend has acknowledged the release.
    async fn unload(&self) -> Result<(), BackendError>;
}

/// Conversational text generation.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, BackendError>;
}

/// Image synthesis. `Ok(None)` means the backend finished without output.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn generate(
        &self,
        positive: &str,
        negative: &str,
        attachment: Option<&[u8]>,
    ) -> Result<Option<Vec<u8>>, BackendError>;
}

#[async_trait]
impl TextModelControl for OllamaClient {
    async fn load(&self) -> Result<(), BackendError> {
        Ok(self.load_model().await?)
    }

    async fn unload(&self) -> Result<(), BackendError> {
        Ok(self.unload_model().await?)
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        Ok(OllamaClient::chat(self, messages).await?)
    }
}

#[async_trait]
impl ImageBackend for ImageGenerator {
    async fn generate(
        &self,
        positive: &str,
        negative: &str,
        attachment: Option<&[u8]>,
    ) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(ImageGenerator::generate(self, positive, negative, attachment).await?)
    }
}
