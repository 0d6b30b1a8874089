//! Integration tests for the HTTP surface, exercising it through
//! `build_test_router` with in-memory adapters (§9: "wire them through
//! interface abstractions so tests can substitute in-memory fakes").

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::error::Result;
use common::gpu::{GpuSample, GpuSnapshot};
use common::model::{Catalog, CatalogEntry, ModelRecord, ModelType, Quantization};
use common::traits::{ContainerHandle, ContainerInspection, ContainerRuntime, ContainerSpec, ContainerState, GpuSource, RouterSink};
use orchestrator::{Orchestrator, OrchestratorConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use store::InMemoryStateStore;
use tower::ServiceExt;

struct FakeContainerRuntime;

#[async_trait]
impl ContainerRuntime for FakeContainerRuntime {
    async fn spawn(&self, spec: &ContainerSpec) -> Result<ContainerHandle> {
        Ok(ContainerHandle { id: "fake-id".to_string(), name: spec.name.clone() })
    }
    async fn inspect(&self, name: &str) -> Result<ContainerInspection> {
        Ok(ContainerInspection { state: ContainerState::Running, env: Vec::new(), args: vec![name.to_string()], port: None })
    }
    async fn stop(&self, _name: &str, _timeout: Duration) -> Result<()> {
        Ok(())
    }
    async fn remove(&self, _name: &str) -> Result<()> {
        Ok(())
    }
    async fn wait_ready(&self, _name: &str, _port: u16, _model_name: &str, _deadline: Duration) -> Result<()> {
        Ok(())
    }
    async fn list(&self, _prefix: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

struct FakeGpuSource;

impl GpuSource for FakeGpuSource {
    fn snapshot(&self) -> GpuSnapshot {
        GpuSnapshot {
            gpus: vec![GpuSample {
                index: 0,
                name: "Fake GPU".to_string(),
                memory_total_mb: 24_576,
                memory_used_mb: 1_024,
                memory_free_mb: 23_552,
                utilization_percent: 5,
                temperature_celsius: 40,
                processes: Vec::new(),
            }],
            degraded: false,
            sampled_at_ms: 0,
        }
    }
}

struct FakeRouterSink;

#[async_trait]
impl RouterSink for FakeRouterSink {
    async fn regenerate(&self, _running: &[ModelRecord]) -> Result<()> {
        Ok(())
    }
}

fn test_catalog() -> Catalog {
    Catalog::from_entries(vec![CatalogEntry {
        abbr: "qwen1.5b".to_string(),
        name: "Qwen/Qwen2.5-1.5B-Instruct".to_string(),
        model_type: ModelType::Llm,
        quantization: Quantization::None,
        max_model_len: 2048,
        recommended_vram_mb: Some(4096),
        recommended_gpu_memory_utilization: Some(0.5),
        description: "test catalog entry".to_string(),
        image: "vllm/vllm-openai:latest".to_string(),
    }])
}

fn test_orchestrator() -> Arc<Orchestrator> {
    let store = Arc::new(InMemoryStateStore::new());
    let runtime = Arc::new(FakeContainerRuntime);
    let gpu = Arc::new(FakeGpuSource);
    let router = Arc::new(FakeRouterSink);
    let config = OrchestratorConfig {
        auth_username: "admin".to_string(),
        auth_password_hash: orchestrator::auth::hash_password("secret"),
        jwt_secret: "0".repeat(32),
        session_timeout_hours: 24,
        gpu_count: 1,
    };
    Arc::new(Orchestrator::new(store, runtime, gpu, router, test_catalog(), config))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_unauthenticated_and_ok() {
    let app = api::build_test_router(test_orchestrator());
    let response = app
        .oneshot(Request::builder().uri("/orchestrator/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn version_reports_the_crate_version() {
    let app = api::build_test_router(test_orchestrator());
    let response = app
        .oneshot(Request::builder().uri("/orchestrator/version").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["version"], json!(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn metrics_is_unauthenticated_prometheus_text() {
    let app = api::build_test_router(test_orchestrator());
    let response = app
        .oneshot(Request::builder().uri("/orchestrator/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn models_list_requires_no_auth_and_starts_empty() {
    let app = api::build_test_router(test_orchestrator());
    let response = app
        .oneshot(Request::builder().uri("/orchestrator/models").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn deploy_without_session_is_rejected() {
    let app = api::build_test_router(test_orchestrator());
    let spec = json!({
        "abbr": "qwen1.5b", "name": "Qwen/Qwen2.5-1.5B-Instruct", "type": "llm",
        "max_model_len": 2048, "gpu_memory_utilization": 0.5, "gpu_device": 0
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orchestrator/models/deploy")
                .header("content-type", "application/json")
                .body(Body::from(spec.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_then_deploy_happy_path() {
    let orchestrator = test_orchestrator();
    let app = api::build_test_router(orchestrator.clone());

    let login_body = json!({"username": "admin", "password": "secret"});
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orchestrator/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(login_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let login: Value = body_json(response).await;
    let token = login["token"].as_str().unwrap().to_string();

    let spec = json!({
        "abbr": "qwen1.5b", "name": "Qwen/Qwen2.5-1.5B-Instruct", "type": "llm",
        "max_model_len": 2048, "gpu_memory_utilization": 0.5, "gpu_device": 0
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orchestrator/models/deploy")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(spec.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let record = body_json(response).await;
    assert_eq!(record["abbr"], "qwen1.5b");
    assert_eq!(record["status"], "running");
    assert_eq!(record["endpoint"], "/api/v1/qwen1.5b");
}

#[tokio::test]
async fn api_key_mint_then_use_then_revoke() {
    let orchestrator = test_orchestrator();
    let app = api::build_test_router(orchestrator.clone());

    let login_body = json!({"username": "admin", "password": "secret"});
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orchestrator/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(login_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let login: Value = body_json(response).await;
    let token = login["token"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orchestrator/api-keys?name=k1")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let minted: Value = body_json(response).await;
    let api_key = minted["api_key"].as_str().unwrap().to_string();
    let prefix = minted["prefix"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/orchestrator/api-keys")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let listed: Value = body_json(response).await;
    assert_eq!(listed[0]["prefix"], prefix);
    assert!(listed[0].get("api_key").is_none());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/orchestrator/api-keys/{prefix}"))
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Using the now-revoked key against the data plane fails auth.
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/qwen1.5b/chat/completions")
                .header("authorization", format!("Bearer {api_key}"))
                .header("content-type", "application/json")
                .body(Body::from(json!({"messages": [{"role": "user", "content": "hi"}]}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn chat_completions_missing_model_is_not_found() {
    let orchestrator = test_orchestrator();
    let minted = orchestrator.auth.create_api_key("t".to_string(), String::new()).await.unwrap();
    let app = api::build_test_router(orchestrator);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/nope/chat/completions")
                .header("authorization", format!("Bearer {}", minted.api_key))
                .header("content-type", "application/json")
                .body(Body::from(json!({"messages": [{"role": "user", "content": "hi"}]}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_completions_empty_messages_is_bad_request() {
    let orchestrator = test_orchestrator();
    let minted = orchestrator.auth.create_api_key("t".to_string(), String::new()).await.unwrap();
    let app = api::build_test_router(orchestrator);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/qwen1.5b/chat/completions")
                .header("authorization", format!("Bearer {}", minted.api_key))
                .header("content-type", "application/json")
                .body(Body::from(json!({"messages": []}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
