//! REST client for an Ollama-compatible text-inference server.
//!
//! Covers the three calls the arbiter and worker need: a chat
//! completion, an explicit model preload, and a model unload that
//! releases accelerator memory (`keep_alive: 0`).

use std::time::Duration;

use clair_core::chat::ChatMessage;
use serde::{Deserialize, Serialize};

/// Upper bound on a single completion, including a cold model load.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// HTTP client for one Ollama server and one model.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    keep_alive: String,
}

/// Errors from the Ollama REST layer.
#[derive(Debug, thiserror::Error)]
pub enum OllamaError {
    /// The HTTP request itself failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Ollama returned a non-2xx status code.
    #[error("Ollama API error ({status}): {body}")]
    ApiError { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    keep_alive: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

/// Body for `/api/generate` without a prompt: Ollama only adjusts the
/// model's residency.
#[derive(Debug, Serialize)]
struct ResidencyRequest<'a> {
    model: &'a str,
    stream: bool,
    keep_alive: serde_json::Value,
}

impl OllamaClient {
    /// Create a client for `model` on the server at `base_url`
    /// (e.g. `http://localhost:11434`).
    ///
    /// `keep_alive` is forwarded with every chat request, e.g. `"5m"`.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        keep_alive: impl Into<String>,
    ) -> Result<Self, OllamaError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, base_url, model, keep_alive))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        keep_alive: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            keep_alive: keep_alive.into(),
        }
    }

    /// Name of the model this client drives.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run a non-streaming chat completion and return the reply text.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, OllamaError> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            keep_alive: &self.keep_alive,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await?;

        let parsed: ChatResponse = Self::parse_response(response).await?;
        Ok(parsed.message.content)
    }

    /// Load the model into accelerator memory without generating.
    pub async fn load_model(&self) -> Result<(), OllamaError> {
        tracing::debug!(model = %self.model, "Preloading text model");
        self.set_residency(serde_json::Value::String(self.keep_alive.clone()))
            .await
    }

    /// Ask the server to evict the model immediately.
    ///
    /// Returns only after Ollama acknowledges the request.
    pub async fn unload_model(&self) -> Result<(), OllamaError> {
        tracing::debug!(model = %self.model, "Unloading text model");
        self.set_residency(serde_json::Value::from(0)).await
    }

    // ---- private helpers ----

    async fn set_residency(&self, keep_alive: serde_json::Value) -> Result<(), OllamaError> {
        let body = ResidencyRequest {
            model: &self.model,
            stream: false,
            keep_alive,
        };
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Ensure the response has a success status code, otherwise turn the
    /// status and body into [`OllamaError::ApiError`].
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, OllamaError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(OllamaError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, OllamaError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_matches_wire_shape() {
        let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let body = ChatRequest {
            model: "dolphin-llama3",
            messages: &messages,
            stream: false,
            keep_alive: "5m",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "dolphin-llama3");
        assert_eq!(json["stream"], false);
        assert_eq!(json["keep_alive"], "5m");
        assert_eq!(json["messages"][1]["role"], "user");
    }

    #[test]
    fn unload_request_uses_numeric_zero() {
        let body = ResidencyRequest {
            model: "m",
            stream: false,
            keep_alive: serde_json::Value::from(0),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["keep_alive"], 0);
        assert!(json.get("prompt").is_none());
    }

    #[test]
    fn parses_chat_response() {
        let raw = r#"{"model":"m","created_at":"2026-01-01T00:00:00Z","message":{"role":"assistant","content":"Hi."},"done":true}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.message.content, "Hi.");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = OllamaClient::with_client(
            reqwest::Client::new(),
            "http://localhost:11434/",
            "m",
            "5m",
        );
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model(), "m");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_request_error() {
        let client = OllamaClient::new("http://127.0.0.1:9", "m", "5m").unwrap();
        let err = client.unload_model().await.unwrap_err();
        assert!(matches!(err, OllamaError::Request(_)));
    }
}
