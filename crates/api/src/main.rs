use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clair_api::config::ServerConfig;
use clair_api::router::build_app_router;
use clair_api::state::{AppState, StoreBackend};
use clair_api::stats::JobStats;
use clair_comfyui::api::ComfyUIApi;
use clair_comfyui::client::ComfyUIClient;
use clair_comfyui::{ImageGenerator, WorkflowTemplate};
use clair_ollama::OllamaClient;
use clair_worker::arbiter::ResourceArbiter;
use clair_worker::dispatcher::Dispatcher;
use clair_worker::events::JobEvents;
use clair_worker::ledger::QuotaLedger;
use clair_worker::queue::task_queue;
use clair_worker::sink::webhook_client;
use clair_worker::store::{
    ContextStore, MemoryContextStore, MemoryQuotaStore, PgContextStore, PgQuotaStore, QuotaStore,
};
use clair_worker::worker::DispatchWorker;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clair_api=debug,clair_worker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid configuration")?;
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Stores ---
    let (store, quota_store, context_store): (
        StoreBackend,
        Arc<dyn QuotaStore>,
        Arc<dyn ContextStore>,
    ) = match &config.database_url {
        Some(database_url) => {
            let pool = clair_db::create_pool(database_url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Database connection pool created");

            clair_db::health_check(&pool)
                .await
                .context("Database health check failed")?;
            tracing::info!("Database health check passed");

            clair_db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");

            (
                StoreBackend::Postgres(pool.clone()),
                Arc::new(PgQuotaStore::new(pool.clone())) as Arc<dyn QuotaStore>,
                Arc::new(PgContextStore::new(pool)) as Arc<dyn ContextStore>,
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, quotas and history are kept in memory");
            (
                StoreBackend::Memory,
                Arc::new(MemoryQuotaStore::new()) as Arc<dyn QuotaStore>,
                Arc::new(MemoryContextStore::new(config.worker.context_turns)) as Arc<dyn ContextStore>,
            )
        }
    };

    // --- Backends ---
    let ollama = Arc::new(
        OllamaClient::new(
            &config.ollama.url,
            &config.ollama.model,
            &config.ollama.keep_alive,
        )
        .context("Failed to build text backend client")?,
    );
    tracing::info!(url = %config.ollama.url, model = %config.ollama.model, "Text backend configured");

    let template = WorkflowTemplate::load(&config.comfyui.workflow_path, config.comfyui.nodes.clone())
        .await
        .with_context(|| {
            format!(
                "Failed to load workflow {}",
                config.comfyui.workflow_path.display()
            )
        })?;
    let comfy_http = reqwest::Client::builder()
        .timeout(config.comfyui.completion_timeout)
        .build()
        .context("Failed to build image backend client")?;
    let generator = Arc::new(ImageGenerator::new(
        ComfyUIClient::new(config.comfyui.ws_url.clone()),
        ComfyUIApi::with_client(comfy_http, config.comfyui.url.clone()),
        template,
        config.comfyui.completion_timeout,
    ));
    tracing::info!(url = %config.comfyui.url, "Image backend configured");

    // --- Worker ---
    let events = JobEvents::default();
    let arbiter = Arc::new(ResourceArbiter::new(
        ollama.clone(),
        config.worker.unload_settle,
    ));
    let (queue, receiver) = task_queue();
    let ledger = QuotaLedger::new(
        quota_store,
        config.worker.limits,
        config.worker.vip_roles.clone(),
    );
    let dispatcher = Arc::new(Dispatcher::new(ledger, queue, events.clone()));

    let stats = Arc::new(JobStats::default());
    let stats_handle = tokio::spawn(Arc::clone(&stats).run(events.subscribe()));

    let worker = DispatchWorker::new(
        Arc::clone(&arbiter),
        ollama,
        generator,
        context_store,
        events,
        &config.worker,
    );
    let worker_cancel = CancellationToken::new();
    let worker_handle = tokio::spawn(worker.run(receiver, worker_cancel.clone()));

    // --- App state ---
    let config = Arc::new(config);
    let state = AppState {
        config: Arc::clone(&config),
        dispatcher,
        arbiter,
        store,
        http: webhook_client().context("Failed to build webhook client")?,
        stats,
    };

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, build_app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining queue");

    worker_cancel.cancel();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, worker_handle).await.is_err() {
        tracing::warn!(timeout_secs = config.shutdown_timeout_secs, "Worker did not drain in time");
    }

    // Ends once the worker and the router have dropped their event senders.
    let _ = tokio::time::timeout(Duration::from_secs(5), stats_handle).await;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
