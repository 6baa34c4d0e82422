use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use clair_api::config::{ComfyUIConfig, OllamaConfig, ServerConfig};
use clair_api::router::build_app_router;
use clair_api::state::{AppState, StoreBackend};
use clair_api::stats::JobStats;
use clair_worker::arbiter::ResourceArbiter;
use clair_worker::backend::{BackendError, TextModelControl};
use clair_worker::config::WorkerConfig;
use clair_worker::dispatcher::Dispatcher;
use clair_worker::events::JobEvents;
use clair_worker::ledger::QuotaLedger;
use clair_worker::queue::{task_queue, QueueReceiver};
use clair_worker::store::MemoryQuotaStore;
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const VIP_ROLE: i64 = 4242;

/// Text model control that always succeeds without contacting anything.
struct NoopControl;

#[async_trait]
impl TextModelControl for NoopControl {
    async fn load(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn unload(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        database_url: None,
        ollama: OllamaConfig::default(),
        comfyui: ComfyUIConfig::default(),
        worker: WorkerConfig {
            vip_roles: vec![VIP_ROLE],
            unload_settle: Duration::ZERO,
            ..WorkerConfig::default()
        },
    }
}

/// Build the full application router over in-memory stores.
///
/// No worker is spawned, so admitted jobs stay queued. The returned
/// receiver is the queue's consumer end; dropping it closes the queue.
pub fn build_test_app() -> (Router, QueueReceiver) {
    let config = test_config();
    let (queue, receiver) = task_queue();
    let ledger = QuotaLedger::new(
        Arc::new(MemoryQuotaStore::new()),
        config.worker.limits,
        config.worker.vip_roles.clone(),
    );

    let state = AppState {
        dispatcher: Arc::new(Dispatcher::new(ledger, queue, JobEvents::default())),
        arbiter: Arc::new(ResourceArbiter::new(Arc::new(NoopControl), Duration::ZERO)),
        store: StoreBackend::Memory,
        http: reqwest::Client::new(),
        stats: Arc::new(JobStats::default()),
        config: Arc::new(config),
    };

    (build_app_router(state), receiver)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
