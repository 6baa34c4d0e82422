//! Operator view of the arbiter and queue.

use axum::extract::State;
use axum::Json;
use clair_core::accelerator::AcceleratorState;
use serde::Serialize;

use crate::response::DataResponse;
use crate::state::AppState;
use crate::stats::JobStatsSnapshot;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub accelerator: AcceleratorState,
    /// Jobs waiting behind the one in progress.
    pub backlog: usize,
    pub text_model: String,
    pub image_workflow: String,
    pub jobs: JobStatsSnapshot,
}

/// GET /status
pub async fn get_status(State(state): State<AppState>) -> Json<DataResponse<StatusResponse>> {
    Json(DataResponse {
        data: StatusResponse {
            accelerator: state.arbiter.current(),
            backlog: state.dispatcher.backlog(),
            text_model: state.config.ollama.model.clone(),
            image_workflow: state.config.comfyui.workflow_path.display().to_string(),
            jobs: state.stats.snapshot(),
        },
    })
}
