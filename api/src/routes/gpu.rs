//! `GET /orchestrator/gpu-stats` — unauthenticated GPU snapshot read.

use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use common::gpu::GpuSnapshot;

#[utoipa::path(
    get,
    path = "/orchestrator/gpu-stats",
    responses((status = 200, description = "Most recent GPU snapshot")),
    tag = "system"
)]
pub async fn gpu_stats(State(state): State<AppState>) -> Json<GpuSnapshot> {
    let snapshot = state.orchestrator.deploy.gpu_snapshot();
    Json(snapshot)
}
