//! WebSocket client for connecting to a ComfyUI instance.
//!
//! ComfyUI only pushes execution messages to the WebSocket whose
//! `clientId` matches the one a prompt was submitted with, so every
//! [`ComfyUIConnection`] carries its own freshly generated id.

use tokio_tungstenite::{connect_async, MaybeTlsStream};

/// Raw WebSocket stream type used for ComfyUI connections.
pub type ComfyUIStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Configuration handle for a ComfyUI instance's WebSocket endpoint.
pub struct ComfyUIClient {
    ws_url: String,
}

/// A live WebSocket connection to a ComfyUI instance.
pub struct ComfyUIConnection {
    /// Unique client ID sent during the WebSocket handshake.
    pub client_id: String,
    /// The raw WebSocket stream for reading frames.
    pub ws_stream: ComfyUIStream,
}

impl ComfyUIClient {
    /// * `ws_url` - WebSocket base URL, e.g. `ws://127.0.0.1:8189`.
    pub fn new(ws_url: String) -> Self {
        Self {
            ws_url: ws_url.trim_end_matches('/').to_string(),
        }
    }

    /// WebSocket base URL.
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Connect to the ComfyUI WebSocket endpoint under a new client id.
    pub async fn connect(&self) -> Result<ComfyUIConnection, ComfyUIClientError> {
        let client_id = uuid::Uuid::new_v4().to_string();
        let url = format!("{}/ws?clientId={}", self.ws_url, client_id);

        let (ws_stream, _response) = connect_async(url.as_str()).await.map_err(|e| {
            ComfyUIClientError::Connection(format!(
                "Failed to connect to ComfyUI at {}: {e}",
                self.ws_url
            ))
        })?;

        tracing::debug!(client_id = %client_id, "Connected to ComfyUI at {}", self.ws_url);

        Ok(ComfyUIConnection {
            client_id,
            ws_stream,
        })
    }
}

/// Derive the WebSocket base URL from an HTTP API URL.
///
/// `http://host:8189` becomes `ws://host:8189`, `https` becomes `wss`.
pub fn ws_url_from_api_url(api_url: &str) -> String {
    if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        api_url.to_string()
    }
}

/// Errors that can occur when working with the WebSocket client.
#[derive(Debug, thiserror::Error)]
pub enum ComfyUIClientError {
    /// Failed to establish the initial WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A protocol-level error on an already-established connection.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_ws_urls() {
        assert_eq!(ws_url_from_api_url("http://127.0.0.1:8189"), "ws://127.0.0.1:8189");
        assert_eq!(ws_url_from_api_url("https://gpu.example"), "wss://gpu.example");
        assert_eq!(ws_url_from_api_url("ws://already"), "ws://already");
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        let client = ComfyUIClient::new("ws://127.0.0.1:9".into());
        let err = client.connect().await.err().expect("connection should fail");
        assert!(matches!(err, ComfyUIClientError::Connection(_)));
    }
}
