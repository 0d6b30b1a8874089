//! `/orchestrator/models*` — the model lifecycle surface (§4.4, §6).

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, Session};
use axum::extract::{Path, State};
use axum::Json;
use common::model::{ModelRecord, ModelSpec};
use serde::Serialize;

#[utoipa::path(
    get,
    path = "/orchestrator/models",
    responses((status = 200, description = "All known model records, no secrets")),
    tag = "models"
)]
pub async fn list_models(State(state): State<AppState>) -> ApiResult<Json<Vec<ModelRecord>>> {
    let records = state.orchestrator.deploy.get_all().await?;
    Ok(Json(records.into_iter().map(|r| r.public_view()).collect()))
}

#[utoipa::path(
    post,
    path = "/orchestrator/models/deploy",
    request_body = ModelSpecBody,
    responses((status = 200, description = "Deploy started"), (status = 400), (status = 409), (status = 503)),
    tag = "models",
    security(("session" = []))
)]
pub async fn deploy_model(
    State(state): State<AppState>,
    _session: Session,
    Json(spec): Json<ModelSpec>,
) -> ApiResult<Json<ModelRecord>> {
    if !common::model::validate_abbr(&spec.abbr) {
        return Err(ApiError::bad_request("abbr must match [a-z0-9._-]+"));
    }
    let record = state.orchestrator.deploy.deploy(spec).await?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/orchestrator/models/{abbr}/start",
    responses((status = 200), (status = 404), (status = 409)),
    tag = "models",
    security(("session" = []))
)]
pub async fn start_model(State(state): State<AppState>, _session: Session, Path(abbr): Path<String>) -> ApiResult<Json<ModelRecord>> {
    let record = state.orchestrator.deploy.start(&abbr).await?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/orchestrator/models/{abbr}/stop",
    responses((status = 200), (status = 404)),
    tag = "models",
    security(("session" = []))
)]
pub async fn stop_model(State(state): State<AppState>, _session: Session, Path(abbr): Path<String>) -> ApiResult<Json<ModelRecord>> {
    let record = state.orchestrator.deploy.stop(&abbr).await?;
    Ok(Json(record))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DeletedResponse {
    pub deleted: bool,
}

#[utoipa::path(
    delete,
    path = "/orchestrator/models/{abbr}",
    responses((status = 200, body = DeletedResponse), (status = 404), (status = 409)),
    tag = "models",
    security(("session" = []))
)]
pub async fn delete_model(State(state): State<AppState>, _session: Session, Path(abbr): Path<String>) -> ApiResult<Json<DeletedResponse>> {
    state.orchestrator.deploy.delete(&abbr).await?;
    Ok(Json(DeletedResponse { deleted: true }))
}

/// Placeholder schema type so `utoipa::path`'s `request_body` attribute has
/// something to reference without requiring `common::model::ModelSpec` to
/// carry a `utoipa` dependency it otherwise has no use for.
#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
#[allow(dead_code)]
pub struct ModelSpecBody {
    pub abbr: String,
    pub name: String,
    pub max_model_len: u32,
    pub gpu_memory_utilization: f32,
    pub gpu_device: u32,
}
