//! Route handlers, grouped by the surface they belong to (§6).

pub mod api_keys;
pub mod auth;
pub mod chat;
pub mod gpu;
pub mod health;
pub mod models;
pub mod system;

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        system::metrics,
        system::version,
        gpu::gpu_stats,
        auth::login,
        models::list_models,
        models::deploy_model,
        models::start_model,
        models::stop_model,
        models::delete_model,
        api_keys::list_api_keys,
        api_keys::create_api_key,
        api_keys::delete_api_key,
        chat::chat_completions,
        chat::completions,
        chat::data_plane_models,
    ),
    tags(
        (name = "system", description = "Health and GPU observability"),
        (name = "auth", description = "Operator login and API key management"),
        (name = "models", description = "Model lifecycle"),
        (name = "inference", description = "OpenAI-compatible data plane"),
    )
)]
pub struct ApiDoc;
