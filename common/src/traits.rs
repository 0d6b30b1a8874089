//! The capability traits each adapter crate implements and `orchestrator`
//! consumes as trait objects, per §9 ("wire them through interface
//! abstractions so tests can substitute in-memory fakes"). Modeled on the
//! `AppStateProvider` object-safe-trait-plus-blanket-`Arc`-impl pattern.

use crate::error::Result;
use crate::gpu::GpuSnapshot;
use crate::model::ModelRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A spec handed to the Container Supervisor to start one inference
/// container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub image: String,
    pub name: String,
    pub env: Vec<(String, String)>,
    pub args: Vec<String>,
    pub port_bindings: Vec<(u16, u16)>,
    pub gpu_device: u32,
    pub volumes: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    Running,
    Exited,
    NotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerInspection {
    pub state: ContainerState,
    pub env: Vec<(String, String)>,
    pub args: Vec<String>,
    pub port: Option<u16>,
}

/// A handle to a container that `Spawn` just created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
}

/// §4.1 — Container Supervisor.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn spawn(&self, spec: &ContainerSpec) -> Result<ContainerHandle>;
    async fn inspect(&self, name: &str) -> Result<ContainerInspection>;
    async fn stop(&self, name: &str, timeout: std::time::Duration) -> Result<()>;
    async fn remove(&self, name: &str) -> Result<()>;
    async fn wait_ready(&self, name: &str, port: u16, model_name: &str, deadline: std::time::Duration) -> Result<()>;
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

#[async_trait]
impl ContainerRuntime for Arc<dyn ContainerRuntime> {
    async fn spawn(&self, spec: &ContainerSpec) -> Result<ContainerHandle> {
        (**self).spawn(spec).await
    }
    async fn inspect(&self, name: &str) -> Result<ContainerInspection> {
        (**self).inspect(name).await
    }
    async fn stop(&self, name: &str, timeout: std::time::Duration) -> Result<()> {
        (**self).stop(name, timeout).await
    }
    async fn remove(&self, name: &str) -> Result<()> {
        (**self).remove(name).await
    }
    async fn wait_ready(&self, name: &str, port: u16, model_name: &str, deadline: std::time::Duration) -> Result<()> {
        (**self).wait_ready(name, port, model_name, deadline).await
    }
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).list(prefix).await
    }
}

/// §4.2 — GPU Inspector. A synchronous snapshot read; the polling itself
/// happens on a background task owned by the implementor.
pub trait GpuSource: Send + Sync {
    fn snapshot(&self) -> GpuSnapshot;
}

impl GpuSource for Arc<dyn GpuSource> {
    fn snapshot(&self) -> GpuSnapshot {
        (**self).snapshot()
    }
}

/// §4.3 — Router Generator.
#[async_trait]
pub trait RouterSink: Send + Sync {
    async fn regenerate(&self, running: &[ModelRecord]) -> Result<()>;
}

#[async_trait]
impl RouterSink for Arc<dyn RouterSink> {
    async fn regenerate(&self, running: &[ModelRecord]) -> Result<()> {
        (**self).regenerate(running).await
    }
}

/// §1/§6 — State Store adapter: a thin typed façade over the external KV.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get_model(&self, abbr: &str) -> Result<Option<ModelRecord>>;
    async fn put_model(&self, record: &ModelRecord) -> Result<()>;
    async fn delete_model(&self, abbr: &str) -> Result<()>;
    async fn list_models(&self) -> Result<Vec<ModelRecord>>;

    async fn put_api_key(&self, key_hash: &str, key: &crate::auth::ApiKey) -> Result<()>;
    async fn get_api_key(&self, key_hash: &str) -> Result<Option<crate::auth::ApiKey>>;
    async fn touch_api_key(&self, key_hash: &str, now_ms: i64) -> Result<()>;
    async fn delete_api_key(&self, key_hash: &str) -> Result<()>;
    async fn list_api_keys(&self) -> Result<Vec<(String, crate::auth::ApiKey)>>;
    /// Resolve a stored key's prefix or full hash back to its hash, so
    /// `DELETE /api-keys/{key_or_prefix}` can accept either.
    async fn find_api_key_hash_by_prefix(&self, prefix: &str) -> Result<Option<String>>;
}

#[async_trait]
impl StateStore for Arc<dyn StateStore> {
    async fn get_model(&self, abbr: &str) -> Result<Option<ModelRecord>> {
        (**self).get_model(abbr).await
    }
    async fn put_model(&self, record: &ModelRecord) -> Result<()> {
        (**self).put_model(record).await
    }
    async fn delete_model(&self, abbr: &str) -> Result<()> {
        (**self).delete_model(abbr).await
    }
    async fn list_models(&self) -> Result<Vec<ModelRecord>> {
        (**self).list_models().await
    }
    async fn put_api_key(&self, key_hash: &str, key: &crate::auth::ApiKey) -> Result<()> {
        (**self).put_api_key(key_hash, key).await
    }
    async fn get_api_key(&self, key_hash: &str) -> Result<Option<crate::auth::ApiKey>> {
        (**self).get_api_key(key_hash).await
    }
    async fn touch_api_key(&self, key_hash: &str, now_ms: i64) -> Result<()> {
        (**self).touch_api_key(key_hash, now_ms).await
    }
    async fn delete_api_key(&self, key_hash: &str) -> Result<()> {
        (**self).delete_api_key(key_hash).await
    }
    async fn list_api_keys(&self) -> Result<Vec<(String, crate::auth::ApiKey)>> {
        (**self).list_api_keys().await
    }
    async fn find_api_key_hash_by_prefix(&self, prefix: &str) -> Result<Option<String>> {
        (**self).find_api_key_hash_by_prefix(prefix).await
    }
}
