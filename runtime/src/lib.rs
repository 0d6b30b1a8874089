//! The Container Supervisor (§4.1): spawns, inspects, stops, and removes
//! inference containers via the `docker` CLI, and polls a spawned
//! container's inference port for readiness.
//!
//! Subprocess invocation follows the same `Command::new(...).output()`
//! idiom the teacher uses for `nvidia-smi`/`lsof`; the readiness poll
//! reuses the teacher's `reqwest::Client` construction style from its
//! model downloader.

pub mod error;

use async_trait::async_trait;
use common::error::Result as OrchResult;
use common::traits::{ContainerHandle, ContainerInspection, ContainerRuntime, ContainerSpec, ContainerState};
use error::RuntimeError;
use std::time::Duration;
use tokio::process::Command;

pub struct DockerRuntime {
    client: reqwest::Client,
    network: String,
}

impl DockerRuntime {
    pub fn new(network: impl Into<String>) -> Self {
        DockerRuntime {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("reqwest client construction"),
            network: network.into(),
        }
    }

    async fn run_docker(&self, args: &[String]) -> Result<std::process::Output, RuntimeError> {
        Command::new("docker")
            .args(args)
            .output()
            .await
            .map_err(|e| RuntimeError::RuntimeDown.context(e))
    }
}

/// Attaches a diagnostic detail to an otherwise context-free variant
/// without changing its `kind()` mapping.
trait WithContext {
    fn context(self, e: impl std::fmt::Display) -> RuntimeError;
}
impl WithContext for RuntimeError {
    fn context(self, e: impl std::fmt::Display) -> RuntimeError {
        tracing::error!(error = %e, "docker invocation failed");
        self
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn spawn(&self, spec: &ContainerSpec) -> OrchResult<ContainerHandle> {
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            spec.name.clone(),
            "--network".to_string(),
            self.network.clone(),
            "--gpus".to_string(),
            format!("device={}", spec.gpu_device),
        ];
        for (host, container) in &spec.port_bindings {
            args.push("-p".to_string());
            args.push(format!("{host}:{container}"));
        }
        for (k, v) in &spec.env {
            args.push("-e".to_string());
            args.push(format!("{k}={v}"));
        }
        for (host, container) in &spec.volumes {
            args.push("-v".to_string());
            args.push(format!("{host}:{container}"));
        }
        args.push(spec.image.clone());
        args.extend(spec.args.iter().cloned());

        let output = self.run_docker(&args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            tracing::warn!(container = %spec.name, stderr = %stderr, "docker run failed");
            let err = classify_spawn_failure(&stderr);
            return Err(err.into());
        }
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::info!(container = %spec.name, id = %id, gpu = spec.gpu_device, "container spawned");
        Ok(ContainerHandle { id, name: spec.name.clone() })
    }

    async fn inspect(&self, name: &str) -> OrchResult<ContainerInspection> {
        let output = self
            .run_docker(&["inspect".to_string(), name.to_string()])
            .await?;
        if !output.status.success() {
            return Ok(ContainerInspection {
                state: ContainerState::NotFound,
                env: Vec::new(),
                args: Vec::new(),
                port: None,
            });
        }
        let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| RuntimeError::Other(format!("docker inspect parse error: {e}")))?;
        let entry = parsed.get(0).ok_or_else(|| RuntimeError::NotFound(name.to_string()))?;

        let running = entry
            .pointer("/State/Running")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let state = if running { ContainerState::Running } else { ContainerState::Exited };

        let env: Vec<(String, String)> = entry
            .pointer("/Config/Env")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str())
                    .filter_map(|s| s.split_once('='))
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let args: Vec<String> = entry
            .pointer("/Args")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).map(str::to_string).collect())
            .unwrap_or_default();

        Ok(ContainerInspection { state, env, args, port: None })
    }

    async fn stop(&self, name: &str, timeout: Duration) -> OrchResult<()> {
        let output = self
            .run_docker(&["stop".to_string(), "-t".to_string(), timeout.as_secs().to_string(), name.to_string()])
            .await?;
        if !output.status.success() {
            tracing::warn!(container = name, "docker stop reported failure, container may already be stopped");
        }
        Ok(())
    }

    async fn remove(&self, name: &str) -> OrchResult<()> {
        let output = self.run_docker(&["rm".to_string(), "-f".to_string(), name.to_string()]).await?;
        if !output.status.success() {
            tracing::debug!(container = name, "docker rm: container already absent");
        }
        Ok(())
    }

    async fn wait_ready(&self, name: &str, port: u16, model_name: &str, deadline: Duration) -> OrchResult<()> {
        let url = format!("http://{name}:{port}/v1/models");
        let start = tokio::time::Instant::now();
        let mut backoff = Duration::from_millis(500);
        let max_backoff = Duration::from_secs(5);

        loop {
            if start.elapsed() >= deadline {
                return Err(RuntimeError::ReadinessTimeout(name.to_string()).into());
            }
            match self.client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    if let Ok(body) = resp.json::<serde_json::Value>().await {
                        let matches = body
                            .pointer("/data/0/id")
                            .and_then(|v| v.as_str())
                            .map(|id| id == model_name)
                            .unwrap_or(false);
                        if matches {
                            tracing::info!(container = name, "container ready");
                            return Ok(());
                        }
                    }
                }
                Ok(_) | Err(_) => {}
            }
            tokio::time::sleep(backoff).await;
            backoff = std::cmp::min(backoff * 2, max_backoff);
        }
    }

    async fn list(&self, prefix: &str) -> OrchResult<Vec<String>> {
        let output = self
            .run_docker(&[
                "ps".to_string(),
                "-a".to_string(),
                "--filter".to_string(),
                format!("name={prefix}"),
                "--format".to_string(),
                "{{.Names}}".to_string(),
            ])
            .await?;
        if !output.status.success() {
            return Err(RuntimeError::RuntimeDown.into());
        }
        let names = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        Ok(names)
    }
}

fn classify_spawn_failure(stderr: &str) -> RuntimeError {
    let lower = stderr.to_lowercase();
    if lower.contains("no such image") || lower.contains("pull access denied") {
        RuntimeError::ImageMissing(stderr.to_string())
    } else if lower.contains("port is already allocated") {
        RuntimeError::PortConflict(0)
    } else if lower.contains("nvidia") || lower.contains("gpu") {
        RuntimeError::GpuUnavailable(0)
    } else if lower.contains("cannot connect to the docker daemon") {
        RuntimeError::RuntimeDown
    } else {
        RuntimeError::Other(stderr.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_image_missing_from_stderr() {
        assert!(matches!(
            classify_spawn_failure("Unable to find image 'x:latest' locally\ndocker: Error response from daemon: pull access denied"),
            RuntimeError::ImageMissing(_)
        ));
    }

    #[test]
    fn classifies_daemon_down() {
        assert!(matches!(
            classify_spawn_failure("Cannot connect to the Docker daemon at unix:///var/run/docker.sock"),
            RuntimeError::RuntimeDown
        ));
    }

    #[test]
    fn classifies_port_conflict() {
        assert!(matches!(
            classify_spawn_failure("docker: Error response from daemon: driver failed programming external connectivity: Bind for 0.0.0.0:8000 failed: port is already allocated."),
            RuntimeError::PortConflict(_)
        ));
    }
}
