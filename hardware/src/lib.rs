//! The GPU Inspector (§4.2): a background task that polls `nvidia-smi` at
//! a fixed cadence and publishes an atomically-swapped snapshot, plus the
//! `GpuSource` implementation that reads it.
//!
//! Modeled on `task-scheduler`'s `tokio::select!` + `time::interval`
//! background-task shape, one level simpler since there's no priority
//! queue here — just a fixed-cadence sampler and a shutdown signal.

mod nvidia;

use arc_swap::ArcSwap;
use common::gpu::GpuSnapshot;
use common::traits::GpuSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Owns the current snapshot and the handle to stop the poller.
pub struct Inspector {
    snapshot: Arc<ArcSwap<GpuSnapshot>>,
    shutdown: watch::Sender<bool>,
}

impl Inspector {
    /// Spawns the polling task and returns an `Inspector` whose
    /// `snapshot()` reads are always lock-free.
    pub fn spawn() -> Self {
        let snapshot = Arc::new(ArcSwap::from_pointee(GpuSnapshot::default()));
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let poller_snapshot = Arc::clone(&snapshot);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let gpus = nvidia::sample().await;
                        let degraded = gpus.is_empty();
                        if degraded {
                            tracing::debug!("GPU snapshot degraded: no GPUs reported by nvidia-smi");
                        }
                        for gpu in &gpus {
                            common::metrics::record_gpu_sample(gpu.index, gpu.memory_used_mb);
                        }
                        poller_snapshot.store(Arc::new(GpuSnapshot {
                            gpus,
                            degraded,
                            sampled_at_ms: common::time::now_ms(),
                        }));
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("GPU Inspector poller shutting down");
                            break;
                        }
                    }
                }
            }
        });

        Inspector { snapshot, shutdown: shutdown_tx }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl GpuSource for Inspector {
    fn snapshot(&self) -> GpuSnapshot {
        (**self.snapshot.load()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn freshly_spawned_inspector_starts_with_empty_snapshot() {
        let inspector = Inspector::spawn();
        let snap = inspector.snapshot();
        assert!(snap.gpus.is_empty());
        inspector.shutdown();
    }
}
