use std::path::PathBuf;
use std::time::Duration;

use clair_comfyui::client::ws_url_from_api_url;
use clair_comfyui::generator::DEFAULT_COMPLETION_TIMEOUT;
use clair_comfyui::WorkflowNodes;
use clair_core::env::{parse_or, var_opt, var_or};
use clair_core::error::CoreError;
use clair_worker::config::WorkerConfig;

/// Text backend connection settings.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL (default: `http://localhost:11434`).
    pub url: String,
    /// Model name (default: `dolphin-llama3`).
    pub model: String,
    /// How long the model stays resident after a request (default: `5m`).
    pub keep_alive: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "dolphin-llama3".to_string(),
            keep_alive: "5m".to_string(),
        }
    }
}

/// Image backend connection settings.
#[derive(Debug, Clone)]
pub struct ComfyUIConfig {
    /// REST base URL (default: `http://127.0.0.1:8189`).
    pub url: String,
    /// WebSocket URL (default: derived from `url`).
    pub ws_url: String,
    /// API-format workflow file (default: `workflow_api.json`).
    pub workflow_path: PathBuf,
    pub nodes: WorkflowNodes,
    /// Upper bound on one generation (default: 600 s).
    pub completion_timeout: Duration,
}

impl Default for ComfyUIConfig {
    fn default() -> Self {
        let url = "http://127.0.0.1:8189".to_string();
        Self {
            ws_url: ws_url_from_api_url(&url),
            url,
            workflow_path: PathBuf::from("workflow_api.json"),
            nodes: WorkflowNodes::default(),
            completion_timeout: DEFAULT_COMPLETION_TIMEOUT,
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for a single-machine deployment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long the worker may take to drain on shutdown (default: `120`).
    pub shutdown_timeout_secs: u64,
    /// PostgreSQL URL. Without it quotas and history live in memory.
    pub database_url: Option<String>,
    pub ollama: OllamaConfig,
    pub comfyui: ComfyUIConfig,
    pub worker: WorkerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `120`                      |
    /// | `DATABASE_URL`          | unset (in-memory stores)   |
    /// | `OLLAMA_URL`            | `http://localhost:11434`   |
    /// | `TEXT_MODEL`            | `dolphin-llama3`           |
    /// | `TEXT_KEEP_ALIVE`       | `5m`                       |
    /// | `COMFYUI_URL`           | `http://127.0.0.1:8189`    |
    /// | `COMFYUI_WS_URL`        | derived from `COMFYUI_URL` |
    /// | `COMFYUI_WORKFLOW`      | `workflow_api.json`        |
    /// | `COMFYUI_POSITIVE_NODE` | `6`                        |
    /// | `COMFYUI_NEGATIVE_NODE` | `7`                        |
    /// | `COMFYUI_SEED_NODE`     | `3`                        |
    /// | `COMFYUI_IMAGE_NODE`    | unset                      |
    /// | `COMFYUI_TIMEOUT_SECS`  | `600`                      |
    ///
    /// Worker settings are read by [`WorkerConfig::from_env`].
    pub fn from_env() -> Result<Self, CoreError> {
        let ollama_defaults = OllamaConfig::default();
        let ollama = OllamaConfig {
            url: var_or("OLLAMA_URL", &ollama_defaults.url),
            model: var_or("TEXT_MODEL", &ollama_defaults.model),
            keep_alive: var_or("TEXT_KEEP_ALIVE", &ollama_defaults.keep_alive),
        };

        let comfy_defaults = ComfyUIConfig::default();
        let comfy_url = var_or("COMFYUI_URL", &comfy_defaults.url);
        let node_defaults = comfy_defaults.nodes;
        let comfyui = ComfyUIConfig {
            ws_url: var_opt("COMFYUI_WS_URL").unwrap_or_else(|| ws_url_from_api_url(&comfy_url)),
            url: comfy_url,
            workflow_path: PathBuf::from(var_or("COMFYUI_WORKFLOW", "workflow_api.json")),
            nodes: WorkflowNodes {
                positive: var_or("COMFYUI_POSITIVE_NODE", &node_defaults.positive),
                negative: var_or("COMFYUI_NEGATIVE_NODE", &node_defaults.negative),
                seed: var_or("COMFYUI_SEED_NODE", &node_defaults.seed),
                load_image: var_opt("COMFYUI_IMAGE_NODE"),
            },
            completion_timeout: Duration::from_secs(parse_or(
                "COMFYUI_TIMEOUT_SECS",
                comfy_defaults.completion_timeout.as_secs(),
            )?),
        };

        Ok(Self {
            host: var_or("HOST", "0.0.0.0"),
            port: parse_or("PORT", 3000)?,
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: parse_or("SHUTDOWN_TIMEOUT_SECS", 120)?,
            database_url: var_opt("DATABASE_URL"),
            ollama,
            comfyui,
            worker: WorkerConfig::from_env()?,
        })
    }
}
