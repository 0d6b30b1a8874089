//! Shared Axum state and the two credential extractors (session bearer
//! token for `/orchestrator/*` writes, API key for the data plane).

use crate::error::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::auth::SessionClaims;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use orchestrator::Orchestrator;
use std::sync::{Arc, OnceLock};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub metrics_handle: PrometheusHandle,
}

/// Installs the global Prometheus recorder exactly once per process. Axum
/// test helpers may build several routers in one test binary; the second
/// `PrometheusBuilder::install_recorder` call would fail outright, so every
/// `AppState` shares the handle from the first install instead of each
/// racing to install its own.
fn shared_metrics_handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| {
            common::metrics::init_metrics();
            PrometheusBuilder::new().install_recorder().expect("install global Prometheus recorder")
        })
        .clone()
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        AppState { orchestrator, metrics_handle: shared_metrics_handle() }
    }
}

fn bearer(parts: &Parts) -> Option<&str> {
    parts.headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
}

/// Extracts and verifies the operator session token from `Authorization:
/// Bearer <token>`. Used by every `/orchestrator/*` write route.
pub struct Session(pub SessionClaims);

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer(parts).ok_or_else(ApiError::unauthorized)?;
        let claims = state.orchestrator.auth.require_session(token)?;
        Ok(Session(claims))
    }
}

/// Extracts and verifies a data-plane API key from either `Authorization:
/// Bearer <key>` or `X-API-Key: <key>`.
pub struct ApiKeyAuth(pub common::auth::ApiKey);

impl FromRequestParts<AppState> for ApiKeyAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header_value = bearer(parts)
            .map(|t| t.to_string())
            .or_else(|| parts.headers.get("x-api-key").and_then(|v| v.to_str().ok()).map(|s| s.to_string()))
            .ok_or_else(ApiError::unauthorized)?;
        let key = state.orchestrator.auth.require_key(&header_value).await?;
        Ok(ApiKeyAuth(key))
    }
}
