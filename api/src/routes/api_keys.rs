//! `/orchestrator/api-keys*` — mint, list, and revoke API keys (§4.6).

use crate::error::ApiResult;
use crate::state::{AppState, Session};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ApiKeySummary {
    pub name: String,
    pub prefix: String,
    pub description: String,
    pub created_at: i64,
    pub last_used_at: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/orchestrator/api-keys",
    responses((status = 200, body = [ApiKeySummary])),
    tag = "auth",
    security(("session" = []))
)]
pub async fn list_api_keys(State(state): State<AppState>, _session: Session) -> ApiResult<Json<Vec<ApiKeySummary>>> {
    let keys = state.orchestrator.auth.list_api_keys().await?;
    Ok(Json(
        keys.into_iter()
            .map(|(_, k)| ApiKeySummary {
                name: k.name,
                prefix: k.prefix,
                description: k.description,
                created_at: k.created_at,
                last_used_at: k.last_used_at,
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CreateApiKeyParams {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MintedApiKeyResponse {
    pub api_key: String,
    pub name: String,
    pub prefix: String,
}

#[utoipa::path(
    post,
    path = "/orchestrator/api-keys",
    params(CreateApiKeyParams),
    responses((status = 200, body = MintedApiKeyResponse), (status = 400)),
    tag = "auth",
    security(("session" = []))
)]
pub async fn create_api_key(
    State(state): State<AppState>,
    _session: Session,
    Query(params): Query<CreateApiKeyParams>,
) -> ApiResult<Json<MintedApiKeyResponse>> {
    let minted = state.orchestrator.auth.create_api_key(params.name, params.description).await?;
    Ok(Json(MintedApiKeyResponse { api_key: minted.api_key, name: minted.name, prefix: minted.prefix }))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DeletedResponse {
    pub deleted: bool,
}

#[utoipa::path(
    delete,
    path = "/orchestrator/api-keys/{key_or_prefix}",
    responses((status = 200, body = DeletedResponse), (status = 404)),
    tag = "auth",
    security(("session" = []))
)]
pub async fn delete_api_key(
    State(state): State<AppState>,
    _session: Session,
    Path(key_or_prefix): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    state.orchestrator.auth.delete_api_key(&key_or_prefix).await?;
    Ok(Json(DeletedResponse { deleted: true }))
}
