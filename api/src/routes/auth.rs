//! `POST /orchestrator/auth/login` — the only unauthenticated write route.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
}

#[utoipa::path(
    post,
    path = "/orchestrator/auth/login",
    request_body = LoginRequest,
    responses((status = 200, description = "Session token issued", body = LoginResponse)),
    tag = "auth"
)]
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> ApiResult<Json<LoginResponse>> {
    if body.username.is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("username and password are required"));
    }
    let token = state.orchestrator.auth.login(&body.username, &body.password)?;
    let claims = state.orchestrator.auth.require_session(&token)?;
    Ok(Json(LoginResponse { token, expires_at: claims.expires_at }))
}
