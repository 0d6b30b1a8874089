//! `GET /orchestrator/metrics` (Prometheus text exposition) and
//! `GET /orchestrator/version` (build metadata) — ambient operator surfaces
//! layered on top of `spec.md` §6, matching the teacher's own
//! `/metrics`-via-`metrics-exporter-prometheus` idiom.

use crate::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

#[utoipa::path(
    get,
    path = "/orchestrator/metrics",
    responses((status = 200, description = "Prometheus text exposition")),
    tag = "system"
)]
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics_handle.render()
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct VersionResponse {
    pub version: String,
    pub git_sha: Option<String>,
}

#[utoipa::path(
    get,
    path = "/orchestrator/version",
    responses((status = 200, description = "Build metadata", body = VersionResponse)),
    tag = "system"
)]
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse { version: env!("CARGO_PKG_VERSION").to_string(), git_sha: option_env!("MIND_GIT_SHA").map(str::to_string) })
}
