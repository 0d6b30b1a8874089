//! RFC 7807 Problem Details error mapping for the HTTP surface (§7's
//! "HTTP layer maps them to status codes via a central table").

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::error::{ErrorKind, OrchestratorError};
use serde::{Deserialize, Serialize};

pub type ApiResult<T> = Result<T, ApiError>;

/// Wraps [`OrchestratorError`] at the HTTP edge. Every variant maps to
/// exactly one status code via [`ErrorKind`]; there is no second taxonomy
/// to keep in sync.
#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub trace_id: uuid::Uuid,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError { kind: ErrorKind::Validation, message: message.into(), trace_id: uuid::Uuid::new_v4() }
    }

    pub fn unauthorized() -> Self {
        ApiError { kind: ErrorKind::Auth, message: "authentication required".to_string(), trace_id: uuid::Uuid::new_v4() }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        ApiError { kind: e.kind(), message: e.to_string(), trace_id: uuid::Uuid::new_v4() }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Auth => StatusCode::UNAUTHORIZED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::ResourceExhausted => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        ErrorKind::ContextOverflow => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn kind_name(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "ValidationError",
        ErrorKind::Auth => "AuthError",
        ErrorKind::NotFound => "NotFound",
        ErrorKind::Conflict => "Conflict",
        ErrorKind::ResourceExhausted => "ResourceExhausted",
        ErrorKind::Upstream => "UpstreamError",
        ErrorKind::ContextOverflow => "ContextOverflow",
        ErrorKind::Internal => "Internal",
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorDetail {
    kind: String,
    message: String,
    trace_id: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.kind);
        // Auth failures never leak detail; everything else is safe to echo
        // since OrchestratorError messages never carry internal paths.
        let message = if self.kind == ErrorKind::Auth { "authentication failed".to_string() } else { self.message };
        let body = ErrorBody {
            error: ErrorDetail { kind: kind_name(self.kind).to_string(), message, trace_id: self.trace_id.to_string() },
        };
        (status, Json(body)).into_response()
    }
}
