//! The Router Generator (§4.3): renders the reverse-proxy include file
//! from running model records and atomically writes it, then signals the
//! proxy to reload.

mod render;

use async_trait::async_trait;
use common::error::{OrchestratorError, Result};
use common::model::ModelRecord;
use common::traits::RouterSink;
use std::path::PathBuf;
use tokio::process::Command;

pub use render::render as render_include_file;

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub target_path: PathBuf,
    pub orchestrator_port: u16,
    /// e.g. `["nginx", "-s", "reload"]`. Split so no shell is invoked.
    pub reload_command: Vec<String>,
}

impl RouterConfig {
    pub fn new(target_path: PathBuf, orchestrator_port: u16) -> Self {
        RouterConfig {
            target_path,
            orchestrator_port,
            reload_command: vec!["nginx".into(), "-s".into(), "reload".into()],
        }
    }
}

pub struct RouterGenerator {
    config: RouterConfig,
}

impl RouterGenerator {
    pub fn new(config: RouterConfig) -> Self {
        RouterGenerator { config }
    }

    async fn write_atomically(&self, contents: &str) -> Result<()> {
        common::platform::ensure_parent_dir(&self.config.target_path)
            .map_err(|e| OrchestratorError::Internal(format!("router dir create failed: {e}")))?;

        let parent = self
            .config
            .target_path
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."));
        let tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| OrchestratorError::Internal(format!("router temp file failed: {e}")))?;
        tokio::fs::write(tmp.path(), contents)
            .await
            .map_err(|e| OrchestratorError::Internal(format!("router temp write failed: {e}")))?;
        tmp.persist(&self.config.target_path)
            .map_err(|e| OrchestratorError::Internal(format!("router rename failed: {e}")))?;
        Ok(())
    }

    async fn signal_reload(&self) {
        if self.config.reload_command.is_empty() {
            return;
        }
        let (program, args) = self.config.reload_command.split_first().expect("checked non-empty");
        match Command::new(program).args(args).output().await {
            Ok(output) if output.status.success() => {
                tracing::info!("reverse proxy reload signaled");
            }
            Ok(output) => {
                tracing::error!(
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "reverse proxy reload command failed; write is durable, not retried here"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to invoke reverse proxy reload command");
            }
        }
    }
}

#[async_trait]
impl RouterSink for RouterGenerator {
    async fn regenerate(&self, running: &[ModelRecord]) -> Result<()> {
        let contents = render_include_file(running, self.config.orchestrator_port);
        self.write_atomically(&contents).await?;
        self.signal_reload().await;
        Ok(())
    }
}
