//! Data-plane routes, prefix `/api/v1/{abbr}` (§4.5, §6). `chat/completions`
//! goes through the Context Mediator; `completions` and `models` are
//! reverse-proxied to the container verbatim.

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, ApiKeyAuth};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::error::OrchestratorError;
use common::model::{ModelRecord, ModelStatus};
use orchestrator::context::{truncate, ChatCompletionRequest};
use serde_json::Value;

const RESPONSE_SAFETY_BUFFER: u32 = 50;
const TRUNCATED_HEADER: &str = "x-mind-context-truncated";

async fn running_record(state: &AppState, abbr: &str) -> ApiResult<ModelRecord> {
    let record = state
        .orchestrator
        .deploy
        .get(abbr)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("no such model: {abbr}")))?;
    if record.status != ModelStatus::Running {
        return Err(ApiError::from(OrchestratorError::ResourceExhausted(format!("model {abbr} is not running"))));
    }
    Ok(record)
}

fn upstream_base(record: &ModelRecord) -> String {
    format!("http://{}:{}/v1", record.container_name, record.port)
}

fn forward_client() -> reqwest::Client {
    // A fresh client per call is cheap: reqwest pools connections internally
    // by host, so this still reuses sockets across requests to the same
    // container.
    reqwest::Client::new()
}

async fn send_upstream(url: String, body: Value) -> ApiResult<reqwest::Response> {
    forward_client()
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|e| ApiError::from(OrchestratorError::Upstream(e.to_string())))
}

fn passthrough_response(upstream: reqwest::Response, truncated: bool) -> Response {
    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .to_string();
    let stream = upstream.bytes_stream();
    let mut response = Response::builder().status(status).body(Body::from_stream(stream)).unwrap();
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        response.headers_mut().insert(axum::http::header::CONTENT_TYPE, value);
    }
    if truncated {
        response.headers_mut().insert(TRUNCATED_HEADER, HeaderValue::from_static("true"));
    }
    response
}

#[utoipa::path(
    post,
    path = "/api/v1/{abbr}/chat/completions",
    responses((status = 200, description = "OpenAI-compatible chat completion"), (status = 404), (status = 413), (status = 503)),
    tag = "inference",
    security(("api_key" = []))
)]
pub async fn chat_completions(
    State(state): State<AppState>,
    _auth: ApiKeyAuth,
    Path(abbr): Path<String>,
    Json(raw): Json<Value>,
) -> ApiResult<Response> {
    let record = running_record(&state, &abbr).await?;
    let request: ChatCompletionRequest =
        serde_json::from_value(raw).map_err(|e| ApiError::bad_request(format!("invalid chat completion request: {e}")))?;
    if request.messages.is_empty() {
        return Err(ApiError::bad_request("messages must not be empty"));
    }

    let window = record.max_model_len;
    let requested_max = request.max_tokens.unwrap_or(window / 2).min(window / 2);
    let outcome = truncate(&request.messages, window.saturating_sub(RESPONSE_SAFETY_BUFFER), requested_max)?;
    common::metrics::record_chat_request(&abbr, outcome.input_tokens, outcome.truncated);

    let mut forward = serde_json::to_value(&request).map_err(|e| OrchestratorError::internal(e.to_string()))?;
    let obj = forward.as_object_mut().ok_or_else(|| OrchestratorError::internal("chat request serialized to non-object"))?;
    obj.insert("messages".to_string(), serde_json::to_value(&outcome.messages).unwrap());
    obj.insert("max_tokens".to_string(), Value::from(outcome.max_tokens));

    let url = format!("{}/chat/completions", upstream_base(&record));
    let upstream = send_upstream(url, forward).await?;

    if request.stream {
        Ok(passthrough_response(upstream, outcome.truncated))
    } else {
        let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        let mut body: Value = upstream.json().await.map_err(|e| ApiError::from(OrchestratorError::Upstream(e.to_string())))?;
        if outcome.truncated {
            if let Some(obj) = body.as_object_mut() {
                obj.insert("context_truncated".to_string(), Value::Bool(true));
            }
        }
        let mut response = (status, Json(body)).into_response();
        if outcome.truncated {
            response.headers_mut().insert(TRUNCATED_HEADER, HeaderValue::from_static("true"));
        }
        Ok(response)
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/{abbr}/completions",
    responses((status = 200, description = "OpenAI-compatible legacy completion passthrough"), (status = 404), (status = 503)),
    tag = "inference",
    security(("api_key" = []))
)]
pub async fn completions(
    State(state): State<AppState>,
    _auth: ApiKeyAuth,
    Path(abbr): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let record = running_record(&state, &abbr).await?;
    let url = format!("{}/completions", upstream_base(&record));
    let upstream = send_upstream(url, body).await?;
    Ok(passthrough_response(upstream, false))
}

#[utoipa::path(
    get,
    path = "/api/v1/{abbr}/models",
    responses((status = 200, description = "OpenAI-compatible model listing passthrough"), (status = 404), (status = 503)),
    tag = "inference",
    security(("api_key" = []))
)]
pub async fn data_plane_models(State(state): State<AppState>, _auth: ApiKeyAuth, Path(abbr): Path<String>) -> ApiResult<Response> {
    let record = running_record(&state, &abbr).await?;
    let url = format!("{}/models", upstream_base(&record));
    let upstream = forward_client()
        .get(&url)
        .send()
        .await
        .map_err(|e| ApiError::from(OrchestratorError::Upstream(e.to_string())))?;
    Ok(passthrough_response(upstream, false))
}
