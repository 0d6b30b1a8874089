//! The Reconciler (§4.7): keeps the state store honest against what's
//! actually running in the container runtime. Runs once at boot and then
//! on a timer, the same two-phase "scan, then fix up" shape as the
//! teacher's `task-scheduler` crate's periodic sweep.

use crate::locks::AbbrLocks;
use common::error::Result;
use common::model::{Catalog, ModelRecord, ModelStatus};
use common::traits::{ContainerInspection, ContainerRuntime, ContainerState, RouterSink, StateStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub const RECONCILE_INTERVAL: Duration = Duration::from_secs(30);
const CONTAINER_PREFIX: &str = "MIND_MODEL_";

pub struct Reconciler {
    store: Arc<dyn StateStore>,
    runtime: Arc<dyn ContainerRuntime>,
    router: Arc<dyn RouterSink>,
    catalog: Catalog,
    locks: Arc<AbbrLocks>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub upserted: Vec<String>,
    pub orphans_removed: Vec<String>,
    pub mismatched: Vec<String>,
    pub changed: bool,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn StateStore>,
        runtime: Arc<dyn ContainerRuntime>,
        router: Arc<dyn RouterSink>,
        catalog: Catalog,
        locks: Arc<AbbrLocks>,
    ) -> Self {
        Reconciler { store, runtime, router, catalog, locks }
    }

    /// One reconciliation pass. Never touches a record whose `abbr` is
    /// currently locked by the Deployment Engine (§9 Open Question:
    /// catalog/abbr mismatches are refused and logged, never
    /// auto-registered as `type="unknown"`).
    pub async fn run_once(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        let container_names = self.runtime.list(CONTAINER_PREFIX).await?;
        let mut seen_abbrs = std::collections::HashSet::new();

        for name in &container_names {
            let Some(abbr) = name.strip_prefix(CONTAINER_PREFIX) else { continue };
            if self.locks.is_locked(abbr) {
                tracing::debug!(abbr, "skipping reconcile: lifecycle operation in flight");
                continue;
            }
            seen_abbrs.insert(abbr.to_string());

            if !self.catalog.contains(abbr) {
                tracing::warn!(abbr, container = name, "running container has no matching catalog entry, refusing to register");
                report.mismatched.push(abbr.to_string());
                continue;
            }

            let inspection = self.runtime.inspect(name).await?;
            if inspection.state != ContainerState::Running {
                continue;
            }

            if self.upsert_from_inspection(abbr, name, &inspection).await? {
                report.upserted.push(abbr.to_string());
                report.changed = true;
            }
        }

        for record in self.store.list_models().await? {
            if seen_abbrs.contains(&record.abbr) {
                continue;
            }
            if self.locks.is_locked(&record.abbr) {
                continue;
            }
            if matches!(record.status, ModelStatus::Running | ModelStatus::Deploying) {
                tracing::warn!(abbr = %record.abbr, status = record.status.as_str(), "orphaned record with no matching container, deleting");
                self.store.delete_model(&record.abbr).await?;
                report.orphans_removed.push(record.abbr.clone());
                report.changed = true;
            }
        }

        if report.changed {
            let running: Vec<ModelRecord> =
                self.store.list_models().await?.into_iter().filter(|r| r.status == ModelStatus::Running).collect();
            self.router.regenerate(&running).await?;
        }

        Ok(report)
    }

    async fn upsert_from_inspection(&self, abbr: &str, container_name: &str, inspection: &ContainerInspection) -> Result<bool> {
        let gpu_device = inspection
            .env
            .iter()
            .find(|(k, _)| k == "CUDA_VISIBLE_DEVICES")
            .and_then(|(_, v)| v.parse::<u32>().ok())
            .unwrap_or(0);

        let existing = self.store.get_model(abbr).await?;
        if let Some(existing) = &existing {
            if existing.status == ModelStatus::Running && existing.gpu_device == gpu_device {
                return Ok(false);
            }
        }

        let catalog_entry = self.catalog.get(abbr).expect("checked by caller");
        let now = common::time::now_ms();
        let mut record = existing.unwrap_or_else(|| {
            let spec = common::model::ModelSpec {
                abbr: abbr.to_string(),
                name: catalog_entry.name.clone(),
                model_type: catalog_entry.model_type,
                quantization: catalog_entry.quantization,
                max_model_len: catalog_entry.max_model_len,
                gpu_memory_utilization: catalog_entry.recommended_gpu_memory_utilization.unwrap_or(0.9),
                max_num_seqs: 256,
                gpu_device,
                port: inspection.port.unwrap_or(8000),
            };
            ModelRecord::new_stopped(&spec, now)
        });
        record.status = ModelStatus::Running;
        record.gpu_device = gpu_device;
        record.container_name = container_name.to_string();
        record.last_error = None;
        record.updated_at = now;
        self.store.put_model(&record).await?;
        Ok(true)
    }
}

/// Spawns the boot pass plus the recurring timer, returning a handle that
/// stops the loop when dropped or signalled.
pub struct ReconcilerHandle {
    shutdown: watch::Sender<bool>,
}

impl ReconcilerHandle {
    pub fn spawn(reconciler: Arc<Reconciler>) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            if let Err(e) = reconciler.run_once().await {
                tracing::error!(error = %e, "boot reconciliation failed");
            }

            let mut interval = tokio::time::interval(RECONCILE_INTERVAL);
            interval.tick().await; // first tick fires immediately; boot pass already ran above
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = reconciler.run_once().await {
                            tracing::error!(error = %e, "periodic reconciliation failed");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        ReconcilerHandle { shutdown }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeContainerRuntime, FakeRouterSink};
    use common::model::{CatalogEntry, ModelType, ModelSpec, Quantization};
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

    #[tokio::test]
    async fn orphaned_running_record_with_no_container_is_deleted() {
        let store = Arc::new(InMemoryStateStore::new());
        let spec = ModelSpec {
            abbr: "qwen1.5b".into(),
            name: "Qwen/Qwen2.5-1.5B-Instruct".into(),
            model_type: ModelType::Llm,
            quantization: Quantization::None,
            max_model_len: 2048,
            gpu_memory_utilization: 0.5,
            max_num_seqs: 256,
            gpu_device: 0,
            port: 8000,
        };
        let mut record = ModelRecord::new_stopped(&spec, 0);
        record.status = ModelStatus::Running;
        store.put_model(&record).await.unwrap();

        let reconciler = Reconciler::new(
            store.clone(),
            Arc::new(FakeContainerRuntime::new()),
            Arc::new(FakeRouterSink::new()),
            catalog(),
            Arc::new(AbbrLocks::new()),
        );
        let report = reconciler.run_once().await.unwrap();
        assert_eq!(report.orphans_removed, vec!["qwen1.5b".to_string()]);
        assert!(store.get_model("qwen1.5b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn locked_abbr_is_left_alone() {
        let store = Arc::new(InMemoryStateStore::new());
        let spec = ModelSpec {
            abbr: "qwen1.5b".into(),
            name: "Qwen/Qwen2.5-1.5B-Instruct".into(),
            model_type: ModelType::Llm,
            quantization: Quantization::None,
            max_model_len: 2048,
            gpu_memory_utilization: 0.5,
            max_num_seqs: 256,
            gpu_device: 0,
            port: 8000,
        };
        let mut record = ModelRecord::new_stopped(&spec, 0);
        record.status = ModelStatus::Deploying;
        store.put_model(&record).await.unwrap();

        let locks = Arc::new(AbbrLocks::new());
        let _guard = locks.try_acquire("qwen1.5b").unwrap();

        let reconciler = Reconciler::new(
            store.clone(),
            Arc::new(FakeContainerRuntime::new()),
            Arc::new(FakeRouterSink::new()),
            catalog(),
            locks,
        );
        let report = reconciler.run_once().await.unwrap();
        assert!(report.orphans_removed.is_empty());
        assert!(store.get_model("qwen1.5b").await.unwrap().is_some());
    }
}
