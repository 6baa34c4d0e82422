use std::sync::Arc;

use clair_worker::arbiter::ResourceArbiter;
use clair_worker::dispatcher::Dispatcher;

use crate::config::ServerConfig;
use crate::stats::JobStats;

/// Which backing store quotas and history use.
#[derive(Clone)]
pub enum StoreBackend {
    Postgres(clair_db::DbPool),
    Memory,
}

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Admission front door feeding the dispatch worker.
    pub dispatcher: Arc<Dispatcher>,
    /// Read-only here; the worker drives transitions.
    pub arbiter: Arc<ResourceArbiter>,
    pub store: StoreBackend,
    /// HTTP client for webhook delivery and attachment downloads.
    pub http: reqwest::Client,
    pub stats: Arc<JobStats>,
}
