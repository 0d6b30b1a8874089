//! Library surface for the orchestrator binary: just the CLI argument
//! parser, exposed so integration tests can exercise it without spawning
//! a process.

pub mod config;

pub use config::CliArgs;
