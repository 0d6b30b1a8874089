//! CLI arguments for the orchestrator binary. Env-var-first for anything
//! the host environment already sets (§6); flags always take priority.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the orchestrator binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "mind-orchestrator")]
#[command(about = "Multi-tenant LLM inference orchestrator: HTTP Surface + control plane")]
#[command(version)]
pub struct CliArgs {
    /// Port the HTTP Surface binds to.
    #[arg(long, short = 'p', default_value = "8080", env = "ORCHESTRATOR_PORT")]
    pub port: u16,

    /// Predefined catalog (`models.json`) path. Defaults to the
    /// platform's state directory if not given.
    #[arg(long, env = "MIND_CATALOG_PATH")]
    pub catalog_path: Option<PathBuf>,

    /// Reverse-proxy include file the Router Generator writes. Defaults
    /// to the platform's state directory if not given.
    #[arg(long, env = "MIND_ROUTER_FILE")]
    pub router_file: Option<PathBuf>,

    /// Number of GPUs visible on this host; bounds concurrent deploys
    /// (§4.4: "a global semaphore limits concurrent deploys to one per
    /// GPU").
    #[arg(long, default_value = "1", env = "MIND_GPU_COUNT")]
    pub gpu_count: usize,

    /// Docker network new inference containers attach to (§4.1).
    #[arg(long, default_value = "bridge", env = "MIND_CONTAINER_NETWORK")]
    pub container_network: String,

    /// Disable the Swagger/RapiDoc documentation UIs.
    #[arg(long, env = "MIND_DISABLE_SWAGGER")]
    pub disable_swagger: bool,
}
