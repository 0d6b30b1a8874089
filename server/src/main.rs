//! The orchestrator binary: parses CLI/env configuration, wires the four
//! capability-trait adapters (state store, container runtime, GPU
//! inspector, router generator) into an `Orchestrator`, and serves the
//! HTTP Surface until asked to shut down.

use anyhow::Context;
use clap::Parser;
use common::config::Config;
use common::model::Catalog;
use orchestrator::{Orchestrator, OrchestratorConfig};
use server::config::CliArgs;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    common::logging::init_tracing();

    let args = CliArgs::parse();
    let env_config = Config::from_env().context("invalid environment configuration")?;

    info!(port = args.port, gpu_count = args.gpu_count, "starting mind-orchestrator");

    let catalog_path = args.catalog_path.unwrap_or_else(common::platform::get_default_catalog_path);
    let catalog = Catalog::load_from_file(&catalog_path).context("failed to load predefined catalog")?;
    if catalog.is_empty() {
        tracing::warn!(path = %catalog_path.display(), "predefined catalog is empty; every deploy will be rejected until it is populated");
    } else {
        info!(entries = catalog.len(), path = %catalog_path.display(), "loaded predefined catalog");
    }

    let router_file = args.router_file.unwrap_or_else(common::platform::get_default_router_file_path);

    let store: Arc<dyn common::traits::StateStore> =
        Arc::new(store::RedisStateStore::connect(&env_config.redis_host, env_config.redis_port).await.context("failed to connect to state store")?);
    let runtime: Arc<dyn common::traits::ContainerRuntime> = Arc::new(runtime::DockerRuntime::new(args.container_network));
    let gpu_inspector = hardware::Inspector::spawn();
    let gpu: Arc<dyn common::traits::GpuSource> = Arc::new(gpu_inspector);
    let router_sink: Arc<dyn common::traits::RouterSink> =
        Arc::new(router::RouterGenerator::new(router::RouterConfig::new(router_file, env_config.nginx_port)));

    let orchestrator_config = OrchestratorConfig {
        auth_username: env_config.auth_username,
        auth_password_hash: env_config.auth_password_hash,
        jwt_secret: env_config.jwt_secret,
        session_timeout_hours: env_config.session_timeout_hours,
        gpu_count: args.gpu_count,
    };
    let orchestrator = Arc::new(Orchestrator::new(store, runtime, gpu, router_sink, catalog, orchestrator_config));

    let api_config = api::ApiConfig {
        port: args.port,
        enable_cors: true,
        cors_origins: vec!["*".to_string()],
        enable_swagger: !args.disable_swagger,
    };

    let serve = tokio::spawn(api::run_server(orchestrator.clone(), api_config));

    tokio::select! {
        result = serve => {
            result.context("HTTP Surface task panicked")?.context("HTTP Surface exited with an error")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }

    orchestrator.shutdown();
    Ok(())
}
