//! Axum router assembly (§6): the administrative surface under
//! `/orchestrator`, the OpenAI-compatible data plane under `/api/v1/{abbr}`,
//! and the documentation UIs.

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ApiConfig;
use crate::middleware;
use crate::routes;
use crate::state::AppState;

pub fn configure_routes(state: AppState, config: &ApiConfig) -> Router {
    let mut router = Router::new()
        .route("/orchestrator/health", get(routes::health::health))
        .route("/orchestrator/metrics", get(routes::system::metrics))
        .route("/orchestrator/version", get(routes::system::version))
        .route("/orchestrator/gpu-stats", get(routes::gpu::gpu_stats))
        .route("/orchestrator/auth/login", post(routes::auth::login))
        .route("/orchestrator/models", get(routes::models::list_models))
        .route("/orchestrator/models/deploy", post(routes::models::deploy_model))
        .route("/orchestrator/models/{abbr}/start", post(routes::models::start_model))
        .route("/orchestrator/models/{abbr}/stop", post(routes::models::stop_model))
        .route("/orchestrator/models/{abbr}", delete(routes::models::delete_model))
        .route("/orchestrator/api-keys", get(routes::api_keys::list_api_keys))
        .route("/orchestrator/api-keys", post(routes::api_keys::create_api_key))
        .route("/orchestrator/api-keys/{key_or_prefix}", delete(routes::api_keys::delete_api_key))
        .route("/api/v1/{abbr}/chat/completions", post(routes::chat::chat_completions))
        .route("/api/v1/{abbr}/completions", post(routes::chat::completions))
        .route("/api/v1/{abbr}/models", get(routes::chat::data_plane_models));

    if config.enable_swagger {
        let openapi = routes::ApiDoc::openapi();
        router = router
            .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", openapi.clone()))
            .merge(RapiDoc::new("/api-doc/openapi.json").path("/rapidoc"));
    }

    router
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new()),
        )
        .layer(middleware::cors_layer(config))
        .with_state(state)
}
