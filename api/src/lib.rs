//! The HTTP Surface (§4.8/§6): an Axum router over the `orchestrator`
//! crate's `Orchestrator`, plus OpenAPI docs and the ambient
//! CORS/compression/tracing stack.

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod config;
mod error;
mod middleware;
mod router;
mod routes;
mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use orchestrator::Orchestrator;
use std::net::SocketAddr;
use std::sync::Arc;

/// Binds and serves the HTTP surface until the process is asked to stop.
pub async fn run_server(orchestrator: Arc<Orchestrator>, config: ApiConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("orchestrator HTTP surface listening on http://{addr}");
    if config.enable_swagger {
        tracing::info!("Swagger UI:   http://{addr}/swagger-ui/");
        tracing::info!("RapiDoc:      http://{addr}/rapidoc/");
        tracing::info!("OpenAPI spec: http://{addr}/api-doc/openapi.json");
    }

    let state = AppState::new(orchestrator);
    let app = router::configure_routes(state, &config);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Builds a router directly from an `Orchestrator`, for integration tests
/// that drive it with `tower::ServiceExt::oneshot` instead of binding a
/// socket.
pub fn build_test_router(orchestrator: Arc<Orchestrator>) -> axum::Router {
    let state = AppState::new(orchestrator);
    router::configure_routes(state, &ApiConfig::development(0))
}
