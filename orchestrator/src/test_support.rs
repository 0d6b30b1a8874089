//! Hand-rolled fakes for the four capability traits, used only by this
//! crate's own test suite. Kept here rather than in a separate crate
//! since each fake is a handful of lines.

#![cfg(test)]

use async_trait::async_trait;
use common::error::{OrchestratorError, Result};
use common::gpu::{GpuSample, GpuSnapshot};
use common::model::ModelRecord;
use common::traits::{ContainerHandle, ContainerInspection, ContainerRuntime, ContainerSpec, ContainerState, GpuSource, RouterSink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub struct FakeContainerRuntime {
    ready: AtomicBool,
}

impl FakeContainerRuntime {
    pub fn new() -> Self {
        FakeContainerRuntime { ready: AtomicBool::new(true) }
    }

    pub fn never_ready() -> Self {
        FakeContainerRuntime { ready: AtomicBool::new(false) }
    }
}

#[async_trait]
impl ContainerRuntime for FakeContainerRuntime {
    async fn spawn(&self, spec: &ContainerSpec) -> Result<ContainerHandle> {
        Ok(ContainerHandle { id: "fake-container-id".to_string(), name: spec.name.clone() })
    }

    async fn inspect(&self, name: &str) -> Result<ContainerInspection> {
        Ok(ContainerInspection {
            state: ContainerState::Running,
            env: Vec::new(),
            args: vec![name.to_string()],
            port: None,
        })
    }

    async fn stop(&self, _name: &str, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn remove(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn wait_ready(&self, _name: &str, _port: u16, _model_name: &str, deadline: Duration) -> Result<()> {
        if self.ready.load(Ordering::SeqCst) {
            Ok(())
        } else {
            tokio::time::sleep(deadline).await;
            Err(OrchestratorError::Upstream("container never became ready".to_string()))
        }
    }

    async fn list(&self, _prefix: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

pub struct FakeGpuSource {
    snapshot: GpuSnapshot,
}

impl FakeGpuSource {
    pub fn healthy(free_mb: u64) -> Self {
        FakeGpuSource {
            snapshot: GpuSnapshot {
                gpus: vec![GpuSample {
                    index: 0,
                    name: "Fake GPU".to_string(),
                    memory_total_mb: free_mb + 4096,
                    memory_used_mb: 4096,
                    memory_free_mb: free_mb,
                    utilization_percent: 10,
                    temperature_celsius: 45,
                    processes: Vec::new(),
                }],
                degraded: false,
                sampled_at_ms: 0,
            },
        }
    }
}

impl GpuSource for FakeGpuSource {
    fn snapshot(&self) -> GpuSnapshot {
        self.snapshot.clone()
    }
}

#[derive(Default)]
pub struct FakeRouterSink {
    calls: Mutex<Vec<usize>>,
}

impl FakeRouterSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RouterSink for FakeRouterSink {
    async fn regenerate(&self, running: &[ModelRecord]) -> Result<()> {
        self.calls.lock().unwrap().push(running.len());
        Ok(())
    }
}
