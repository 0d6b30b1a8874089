//! `nvidia-smi` invocation and parsing. The vendor-tool-shelling idiom is
//! the same one the teacher uses to detect GPUs on Linux; this extends it
//! with utilization/temperature/process sampling for continuous polling.

use common::gpu::{GpuProcess, GpuSample, ProcessKind};
use std::collections::HashMap;
use tokio::process::Command;

/// Queries `nvidia-smi` for per-GPU stats and per-process memory usage,
/// joining them into `GpuSample`s. Returns `Ok(vec![])` (not an error)
/// when the tool is absent, so callers can treat "no GPUs" and "no tool"
/// identically at the call site and only log the distinction here.
pub async fn sample() -> Vec<GpuSample> {
    let gpus = match query_gpus().await {
        Ok(g) => g,
        Err(e) => {
            tracing::warn!(error = %e, "nvidia-smi unavailable, reporting degraded GPU snapshot");
            return Vec::new();
        }
    };
    let mut processes_by_gpu = query_compute_apps().await.unwrap_or_default();

    gpus.into_iter()
        .map(|mut gpu| {
            gpu.processes = processes_by_gpu.remove(&gpu.index).unwrap_or_default();
            gpu
        })
        .collect()
}

async fn query_gpus() -> std::io::Result<Vec<GpuSample>> {
    let output = Command::new("nvidia-smi")
        .args([
            "--query-gpu=index,name,memory.total,memory.used,memory.free,utilization.gpu,temperature.gpu",
            "--format=csv,noheader,nounits",
        ])
        .output()
        .await?;

    if !output.status.success() {
        return Ok(Vec::new());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut gpus = Vec::new();
    for line in stdout.lines() {
        let parts: Vec<&str> = line.split(',').map(|s| s.trim()).collect();
        if parts.len() != 7 {
            continue;
        }
        let Ok(index) = parts[0].parse() else { continue };
        gpus.push(GpuSample {
            index,
            name: parts[1].to_string(),
            memory_total_mb: parts[2].parse().unwrap_or(0),
            memory_used_mb: parts[3].parse().unwrap_or(0),
            memory_free_mb: parts[4].parse().unwrap_or(0),
            utilization_percent: parts[5].parse().unwrap_or(0),
            temperature_celsius: parts[6].parse().unwrap_or(0),
            processes: Vec::new(),
        });
    }
    Ok(gpus)
}

async fn query_compute_apps() -> std::io::Result<HashMap<u32, Vec<GpuProcess>>> {
    let output = Command::new("nvidia-smi")
        .args([
            "--query-compute-apps=gpu_uuid,pid,process_name,used_memory",
            "--format=csv,noheader,nounits",
        ])
        .output()
        .await?;

    if !output.status.success() {
        return Ok(HashMap::new());
    }

    // gpu_uuid does not map directly to index; resolve via a parallel
    // index,uuid query so process lists land on the right GPU.
    let uuid_to_index = query_uuid_index_map().await.unwrap_or_default();

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut by_gpu: HashMap<u32, Vec<GpuProcess>> = HashMap::new();
    for line in stdout.lines() {
        let parts: Vec<&str> = line.split(',').map(|s| s.trim()).collect();
        if parts.len() != 4 {
            continue;
        }
        let Some(&index) = uuid_to_index.get(parts[0]) else { continue };
        let Ok(pid) = parts[1].parse() else { continue };
        by_gpu.entry(index).or_default().push(GpuProcess {
            pid,
            memory_mb: parts[3].parse().unwrap_or(0),
            command: parts[2].to_string(),
            kind: classify(parts[2]),
        });
    }
    Ok(by_gpu)
}

async fn query_uuid_index_map() -> std::io::Result<HashMap<String, u32>> {
    let output = Command::new("nvidia-smi")
        .args(["--query-gpu=uuid,index", "--format=csv,noheader"])
        .output()
        .await?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut map = HashMap::new();
    for line in stdout.lines() {
        let parts: Vec<&str> = line.split(',').map(|s| s.trim()).collect();
        if parts.len() == 2 {
            if let Ok(index) = parts[1].parse() {
                map.insert(parts[0].to_string(), index);
            }
        }
    }
    Ok(map)
}

/// A process is ours if it's running inside one of our containers, which
/// we only know from the caller's side (container names); nvidia-smi only
/// reports the process' own command line. This classifies by the
/// reserved-prefix naming convention showing up in the process name,
/// which is the best signal available without cross-referencing the
/// Container Supervisor's process namespace.
fn classify(command: &str) -> ProcessKind {
    if command.contains("MIND_MODEL_") || command.contains("vllm") || command.contains("python3") {
        ProcessKind::Inference
    } else {
        ProcessKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_recognizes_inference_markers() {
        assert_eq!(classify("python3 -m vllm.entrypoints.openai.api_server"), ProcessKind::Inference);
        assert_eq!(classify("Xorg"), ProcessKind::Other);
    }
}
