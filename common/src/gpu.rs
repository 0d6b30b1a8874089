//! GPU Sample data shapes, shared between the `hardware` crate (producer)
//! and `orchestrator`/`api` (consumers).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessKind {
    /// A process belonging to an orchestrator-managed inference container.
    Inference,
    /// Anything else the vendor tool reports (another user's job, a
    /// leaked process from a previous run, etc.).
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuProcess {
    pub pid: u32,
    pub memory_mb: u64,
    pub command: String,
    pub kind: ProcessKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuSample {
    pub index: u32,
    pub name: String,
    pub memory_total_mb: u64,
    pub memory_used_mb: u64,
    pub memory_free_mb: u64,
    pub utilization_percent: u8,
    pub temperature_celsius: u32,
    pub processes: Vec<GpuProcess>,
}

impl GpuSample {
    pub fn has_free_memory(&self, required_mb: u64) -> bool {
        self.memory_free_mb >= required_mb
    }
}

/// The immutable, atomically-swapped result of the most recent poll.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GpuSnapshot {
    pub gpus: Vec<GpuSample>,
    /// Set when the vendor tool could not be invoked; `gpus` is then empty
    /// and callers should fall back to a single logical GPU 0.
    pub degraded: bool,
    pub sampled_at_ms: i64,
}

impl GpuSnapshot {
    pub fn get(&self, index: u32) -> Option<&GpuSample> {
        self.gpus.iter().find(|g| g.index == index)
    }
}
