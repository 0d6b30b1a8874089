//! The Deployment Engine (§4.4): the model lifecycle state machine.
//!
//! Orchestrates the GPU Inspector, Container Supervisor, and Router
//! Generator under a per-`abbr` mutex, the same `Arc<RwLock<HashMap<...>>>`-
//! style lifecycle bookkeeping `appstate::orchestrator::ModelOrchestrator`
//! uses for its own loaded-model tracking, generalized here to a full
//! state machine instead of a flat loaded/unloaded flag.

use crate::locks::AbbrLocks;
use common::error::{OrchestratorError, Result, RetryPolicy};
use common::model::{Catalog, ModelRecord, ModelSpec, ModelStatus};
use common::traits::{ContainerRuntime, ContainerSpec, GpuSource, RouterSink, StateStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub const DEFAULT_DEPLOY_TIMEOUT: Duration = Duration::from_secs(20 * 60);
const STOP_GRACE_PERIOD: Duration = Duration::from_secs(30);

pub struct DeploymentEngine {
    store: Arc<dyn StateStore>,
    runtime: Arc<dyn ContainerRuntime>,
    gpu: Arc<dyn GpuSource>,
    router: Arc<dyn RouterSink>,
    catalog: Catalog,
    locks: Arc<AbbrLocks>,
    deploy_slots: Semaphore,
    deploy_timeout: Duration,
    retry: RetryPolicy,
}

impl DeploymentEngine {
    pub fn new(
        store: Arc<dyn StateStore>,
        runtime: Arc<dyn ContainerRuntime>,
        gpu: Arc<dyn GpuSource>,
        router: Arc<dyn RouterSink>,
        catalog: Catalog,
        gpu_count: usize,
    ) -> Self {
        Self::with_locks(store, runtime, gpu, router, catalog, gpu_count, Arc::new(AbbrLocks::new()))
    }

    /// Shares `locks` with a [`crate::reconcile::Reconciler`] so it never
    /// touches a record that's mid-deploy.
    pub fn with_locks(
        store: Arc<dyn StateStore>,
        runtime: Arc<dyn ContainerRuntime>,
        gpu: Arc<dyn GpuSource>,
        router: Arc<dyn RouterSink>,
        catalog: Catalog,
        gpu_count: usize,
        locks: Arc<AbbrLocks>,
    ) -> Self {
        DeploymentEngine {
            store,
            runtime,
            gpu,
            router,
            catalog,
            locks,
            deploy_slots: Semaphore::new(gpu_count.max(1)),
            deploy_timeout: DEFAULT_DEPLOY_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_deploy_timeout(mut self, timeout: Duration) -> Self {
        self.deploy_timeout = timeout;
        self
    }

    pub async fn get(&self, abbr: &str) -> Result<Option<ModelRecord>> {
        self.store.get_model(abbr).await
    }

    pub async fn get_all(&self) -> Result<Vec<ModelRecord>> {
        let records = self.store.list_models().await?;
        common::metrics::record_models_running(records.iter().filter(|r| r.status == ModelStatus::Running).count());
        Ok(records)
    }

    pub async fn deploy(&self, spec: ModelSpec) -> Result<ModelRecord> {
        if !common::model::validate_abbr(&spec.abbr) {
            return Err(OrchestratorError::Validation(format!("invalid abbr: {}", spec.abbr)));
        }
        let _guard = self.locks.try_acquire(&spec.abbr)?;

        let catalog_entry = self
            .catalog
            .get(&spec.abbr)
            .ok_or_else(|| OrchestratorError::Validation(format!("unknown abbr in catalog: {}", spec.abbr)))?
            .clone();

        let existing = self.store.get_model(&spec.abbr).await?;
        if let Some(existing) = &existing {
            if existing.status != ModelStatus::Stopped {
                return Err(OrchestratorError::Conflict(format!(
                    "model {} is already {}",
                    spec.abbr,
                    existing.status.as_str()
                )));
            }
        }

        self.check_gpu_capacity(&spec, catalog_entry.recommended_vram_mb)?;

        let now = common::time::now_ms();
        let mut record = existing.unwrap_or_else(|| ModelRecord::new_stopped(&spec, now));
        record.status = ModelStatus::Deploying;
        record.progress = 0;
        record.progress_message = "validated, acquiring GPU slot".to_string();
        record.last_error = None;
        record.updated_at = now;
        self.store.put_model(&record).await?;

        let _permit = self
            .deploy_slots
            .acquire()
            .await
            .map_err(|_| OrchestratorError::internal("deploy semaphore closed"))?;

        let started = std::time::Instant::now();
        let outcome = self.run_deploy(&mut record, &spec, &catalog_entry.image).await;
        common::metrics::record_deploy_outcome(&spec.abbr, if outcome.is_ok() { "running" } else { "error" }, started.elapsed().as_secs_f64());
        match outcome {
            Ok(()) => Ok(record),
            Err(e) => {
                self.fail_deploy(&mut record, &e).await;
                Err(e)
            }
        }
    }

    pub async fn start(&self, abbr: &str) -> Result<ModelRecord> {
        let _guard = self.locks.try_acquire(abbr)?;
        let mut record = self
            .store
            .get_model(abbr)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(abbr.to_string()))?;
        if record.status != ModelStatus::Stopped {
            return Err(OrchestratorError::Conflict(format!("model {abbr} is {}", record.status.as_str())));
        }
        let catalog_entry = self
            .catalog
            .get(abbr)
            .ok_or_else(|| OrchestratorError::Validation(format!("unknown abbr in catalog: {abbr}")))?
            .clone();
        let spec = spec_from_record(&record);

        self.check_gpu_capacity(&spec, catalog_entry.recommended_vram_mb)?;

        record.status = ModelStatus::Deploying;
        record.progress = 0;
        record.progress_message = "restarting".to_string();
        record.last_error = None;
        record.updated_at = common::time::now_ms();
        self.store.put_model(&record).await?;

        let _permit = self
            .deploy_slots
            .acquire()
            .await
            .map_err(|_| OrchestratorError::internal("deploy semaphore closed"))?;

        let started = std::time::Instant::now();
        let outcome = self.run_deploy(&mut record, &spec, &catalog_entry.image).await;
        common::metrics::record_deploy_outcome(abbr, if outcome.is_ok() { "running" } else { "error" }, started.elapsed().as_secs_f64());
        match outcome {
            Ok(()) => Ok(record),
            Err(e) => {
                self.fail_deploy(&mut record, &e).await;
                Err(e)
            }
        }
    }

    pub async fn stop(&self, abbr: &str) -> Result<ModelRecord> {
        let _guard = self.locks.try_acquire(abbr)?;
        let mut record = self
            .store
            .get_model(abbr)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(abbr.to_string()))?;

        if record.status == ModelStatus::Stopped {
            return Ok(record);
        }

        record.status = ModelStatus::Stopping;
        record.updated_at = common::time::now_ms();
        self.store.put_model(&record).await?;

        self.runtime.stop(&record.container_name, STOP_GRACE_PERIOD).await?;

        record.status = ModelStatus::Stopped;
        record.progress = 0;
        record.progress_message = String::new();
        record.updated_at = common::time::now_ms();
        self.store.put_model(&record).await?;

        if let Err(e) = self.regenerate_router().await {
            tracing::error!(abbr, error = %e, "router regeneration failed after stop");
        }
        Ok(record)
    }

    pub async fn delete(&self, abbr: &str) -> Result<()> {
        let _guard = self.locks.try_acquire(abbr)?;
        let record = self
            .store
            .get_model(abbr)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(abbr.to_string()))?;

        if matches!(record.status, ModelStatus::Running | ModelStatus::Deploying | ModelStatus::Stopping) {
            let _ = self.runtime.stop(&record.container_name, STOP_GRACE_PERIOD).await;
        }
        let _ = self.runtime.remove(&record.container_name).await;
        self.store.delete_model(abbr).await?;

        if let Err(e) = self.regenerate_router().await {
            tracing::error!(abbr, error = %e, "router regeneration failed after delete");
        }
        Ok(())
    }

    async fn run_deploy(&self, record: &mut ModelRecord, spec: &ModelSpec, image: &str) -> Result<()> {
        self.advance(record, 5, "reserved").await?;

        // Image presence is only knowable once spawn is attempted; the
        // Container Supervisor classifies a missing-image failure for us.
        self.advance(record, 10, "image present").await?;

        let container_spec = ContainerSpec {
            image: image.to_string(),
            name: record.container_name.clone(),
            env: vec![
                ("CUDA_VISIBLE_DEVICES".to_string(), spec.gpu_device.to_string()),
                ("MODEL_NAME".to_string(), spec.name.clone()),
            ],
            args: Vec::new(),
            port_bindings: vec![(record.port, 8000)],
            gpu_device: spec.gpu_device,
            volumes: Vec::new(),
        };

        let handle = self
            .retry
            .run(|| async { self.runtime.spawn(&container_spec).await })
            .await?;
        record.container_id = handle.id.clone();
        self.advance(record, 30, "container created").await?;
        self.advance(record, 50, "container started").await?;

        self.runtime
            .wait_ready(&record.container_name, record.port, &spec.name, self.deploy_timeout)
            .await?;
        self.advance(record, 70, "port reachable").await?;
        self.advance(record, 90, "model registered").await?;

        record.status = ModelStatus::Running;
        record.progress = 100;
        record.progress_message = "ready".to_string();
        record.updated_at = common::time::now_ms();
        self.store.put_model(record).await?;

        if let Err(e) = self.regenerate_router().await {
            tracing::error!(abbr = %record.abbr, error = %e, "proxy reload failed, demoting to error");
            record.status = ModelStatus::Error;
            record.last_error = Some("proxy reload failed".to_string());
            record.updated_at = common::time::now_ms();
            self.store.put_model(record).await?;
            let _ = self.runtime.stop(&record.container_name, STOP_GRACE_PERIOD).await;
            return Err(OrchestratorError::Internal("proxy reload failed".to_string()));
        }
        Ok(())
    }

    async fn advance(&self, record: &mut ModelRecord, progress: u8, message: &str) -> Result<()> {
        record.progress = record.progress.max(progress);
        record.progress_message = message.to_string();
        record.updated_at = common::time::now_ms();
        self.store.put_model(record).await
    }

    async fn fail_deploy(&self, record: &mut ModelRecord, error: &OrchestratorError) {
        tracing::warn!(abbr = %record.abbr, error = %error, "deploy failed, entering error state");
        let _ = self.runtime.stop(&record.container_name, STOP_GRACE_PERIOD).await;
        let _ = self.runtime.remove(&record.container_name).await;
        record.status = ModelStatus::Error;
        record.last_error = Some(error.to_string());
        record.updated_at = common::time::now_ms();
        let _ = self.store.put_model(record).await;
    }

    fn check_gpu_capacity(&self, spec: &ModelSpec, recommended_vram_mb: Option<u64>) -> Result<()> {
        let snapshot = self.gpu.snapshot();
        if snapshot.degraded {
            tracing::warn!(gpu_device = spec.gpu_device, "GPU Inspector degraded, skipping capacity check");
            return Ok(());
        }
        let sample = snapshot
            .get(spec.gpu_device)
            .ok_or_else(|| OrchestratorError::ResourceExhausted(format!("GPU {} not visible", spec.gpu_device)))?;
        match recommended_vram_mb {
            Some(required) if !sample.has_free_memory(required) => Err(OrchestratorError::ResourceExhausted(
                format!("GPU {} has {}MB free, needs {}MB", spec.gpu_device, sample.memory_free_mb, required),
            )),
            Some(_) => Ok(()),
            None => {
                tracing::warn!(abbr = %spec.abbr, "no VRAM estimate available, skipping capacity check");
                Ok(())
            }
        }
    }

    pub async fn regenerate_router(&self) -> Result<()> {
        let running: Vec<ModelRecord> = self
            .store
            .list_models()
            .await?
            .into_iter()
            .filter(|r| r.status == ModelStatus::Running)
            .collect();
        self.router.regenerate(&running).await
    }

    pub fn locks(&self) -> &AbbrLocks {
        &self.locks
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn gpu_snapshot(&self) -> common::gpu::GpuSnapshot {
        self.gpu.snapshot()
    }
}

fn spec_from_record(record: &ModelRecord) -> ModelSpec {
    ModelSpec {
        abbr: record.abbr.clone(),
        name: record.name.clone(),
        model_type: record.model_type,
        quantization: record.quantization,
        max_model_len: record.max_model_len,
        gpu_memory_utilization: record.gpu_memory_utilization,
        max_num_seqs: record.max_num_seqs,
        gpu_device: record.gpu_device,
        port: record.port,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeContainerRuntime, FakeGpuSource, FakeRouterSink};
    use common::model::{CatalogEntry, ModelType, Quantization};
    use store::InMemoryStateStore;

    fn catalog() -> Catalog {
        Catalog::from_entries(vec![CatalogEntry {
            abbr: "qwen1.5b".into(),
            name: "Qwen/Qwen2.5-1.5B-Instruct".into(),
            model_type: ModelType::Llm,
            quantization: Quantization::None,
            max_model_len: 2048,
            recommended_vram_mb: Some(4096),
            recommended_gpu_memory_utilization: Some(0.5),
            description: "test model".into(),
            image: "fake/inference:latest".into(),
        }])
    }

    fn spec() -> ModelSpec {
        ModelSpec {
            abbr: "qwen1.5b".into(),
            name: "Qwen/Qwen2.5-1.5B-Instruct".into(),
            model_type: ModelType::Llm,
            quantization: Quantization::None,
            max_model_len: 2048,
            gpu_memory_utilization: 0.5,
            max_num_seqs: 256,
            gpu_device: 0,
            port: 8000,
        }
    }

    fn engine() -> DeploymentEngine {
        DeploymentEngine::new(
            Arc::new(InMemoryStateStore::new()),
            Arc::new(FakeContainerRuntime::new()),
            Arc::new(FakeGpuSource::healthy(24_576)),
            Arc::new(FakeRouterSink::new()),
            catalog(),
            1,
        )
        .with_deploy_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn deploy_happy_path_reaches_running() {
        let engine = engine();
        let record = engine.deploy(spec()).await.unwrap();
        assert_eq!(record.status, ModelStatus::Running);
        assert_eq!(record.progress, 100);
        assert_eq!(record.endpoint, "/api/v1/qwen1.5b");
    }

    #[tokio::test]
    async fn deploy_rejects_abbr_absent_from_catalog() {
        let engine = engine();
        let mut bad_spec = spec();
        bad_spec.abbr = "unknown".into();
        let err = engine.deploy(bad_spec).await.unwrap_err();
        assert_eq!(err.kind(), common::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn deploy_rejects_insufficient_gpu_memory() {
        let engine = DeploymentEngine::new(
            Arc::new(InMemoryStateStore::new()),
            Arc::new(FakeContainerRuntime::new()),
            Arc::new(FakeGpuSource::healthy(1024)),
            Arc::new(FakeRouterSink::new()),
            catalog(),
            1,
        );
        let err = engine.deploy(spec()).await.unwrap_err();
        assert_eq!(err.kind(), common::ErrorKind::ResourceExhausted);
    }

    #[tokio::test]
    async fn second_deploy_while_in_flight_conflicts() {
        let engine = Arc::new(engine());
        let engine2 = Arc::clone(&engine);

        let _guard = engine.locks().try_acquire("qwen1.5b").unwrap();
        let err = engine2.deploy(spec()).await.unwrap_err();
        assert_eq!(err.kind(), common::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn stop_then_start_round_trips() {
        let engine = engine();
        engine.deploy(spec()).await.unwrap();
        let stopped = engine.stop("qwen1.5b").await.unwrap();
        assert_eq!(stopped.status, ModelStatus::Stopped);
        let started = engine.start("qwen1.5b").await.unwrap();
        assert_eq!(started.status, ModelStatus::Running);
    }

    #[tokio::test]
    async fn delete_removes_record_entirely() {
        let engine = engine();
        engine.deploy(spec()).await.unwrap();
        engine.delete("qwen1.5b").await.unwrap();
        assert!(engine.get("qwen1.5b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_wait_ready_lands_in_error_with_record_retained() {
        let engine = DeploymentEngine::new(
            Arc::new(InMemoryStateStore::new()),
            Arc::new(FakeContainerRuntime::new().never_ready()),
            Arc::new(FakeGpuSource::healthy(24_576)),
            Arc::new(FakeRouterSink::new()),
            catalog(),
            1,
        )
        .with_deploy_timeout(Duration::from_millis(50));

        let err = engine.deploy(spec()).await.unwrap_err();
        assert_eq!(err.kind(), common::ErrorKind::Upstream);
        let record = engine.get("qwen1.5b").await.unwrap().unwrap();
        assert_eq!(record.status, ModelStatus::Error);
        assert!(record.last_error.is_some());
    }
}
