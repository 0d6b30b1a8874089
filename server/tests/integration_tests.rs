//! CLI argument parsing for the orchestrator binary.

use clap::Parser;
use server::config::CliArgs;

#[test]
fn defaults_match_documented_env_vars() {
    let args = CliArgs::parse_from(["mind-orchestrator"]);
    assert_eq!(args.port, 8080);
    assert_eq!(args.gpu_count, 1);
    assert_eq!(args.container_network, "bridge");
    assert!(!args.disable_swagger);
    assert!(args.catalog_path.is_none());
    assert!(args.router_file.is_none());
}

#[test]
fn flags_override_defaults() {
    let args = CliArgs::parse_from([
        "mind-orchestrator",
        "--port",
        "9090",
        "--gpu-count",
        "4",
        "--container-network",
        "mind-net",
        "--disable-swagger",
    ]);
    assert_eq!(args.port, 9090);
    assert_eq!(args.gpu_count, 4);
    assert_eq!(args.container_network, "mind-net");
    assert!(args.disable_swagger);
}
