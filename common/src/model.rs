//! The Model Record and its supporting types.
//!
//! A `ModelRecord` is the orchestrator's authoritative, externally
//! observable description of one deployed (or formerly deployed) inference
//! model. Everything here is plain data; the state machine that mutates it
//! lives in the `orchestrator` crate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `[a-z0-9._-]+`, checked by [`validate_abbr`].
pub type Abbr = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Llm,
    Embedding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantization {
    None,
    Awq,
    Gptq,
}

/// Lifecycle state. See the Deployment Engine state machine for the
/// allowed transitions between these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Stopped,
    Deploying,
    Running,
    Error,
    Stopping,
}

impl ModelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStatus::Stopped => "stopped",
            ModelStatus::Deploying => "deploying",
            ModelStatus::Running => "running",
            ModelStatus::Error => "error",
            ModelStatus::Stopping => "stopping",
        }
    }
}

/// The authoritative description of one deployed model, keyed by `abbr`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    pub abbr: Abbr,
    pub name: String,
    #[serde(rename = "type")]
    pub model_type: ModelType,
    pub quantization: Quantization,
    pub max_model_len: u32,
    pub gpu_memory_utilization: f32,
    pub max_num_seqs: u32,
    pub gpu_device: u32,
    pub port: u16,
    pub endpoint: String,
    pub status: ModelStatus,
    pub progress: u8,
    pub progress_message: String,
    pub container_name: String,
    pub container_id: String,
    pub cache_size_mb: Option<u64>,
    pub cached: Option<bool>,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ModelRecord {
    pub fn container_name_for(abbr: &str) -> String {
        format!("MIND_MODEL_{abbr}")
    }

    pub fn endpoint_for(abbr: &str) -> String {
        format!("/api/v1/{abbr}")
    }

    /// A freshly created record in the `stopped` state, before any deploy
    /// has ever run against it.
    pub fn new_stopped(spec: &ModelSpec, now_ms: i64) -> Self {
        ModelRecord {
            abbr: spec.abbr.clone(),
            name: spec.name.clone(),
            model_type: spec.model_type,
            quantization: spec.quantization,
            max_model_len: spec.max_model_len,
            gpu_memory_utilization: spec.gpu_memory_utilization,
            max_num_seqs: spec.max_num_seqs,
            gpu_device: spec.gpu_device,
            port: spec.port,
            endpoint: Self::endpoint_for(&spec.abbr),
            status: ModelStatus::Stopped,
            progress: 0,
            progress_message: String::new(),
            container_name: Self::container_name_for(&spec.abbr),
            container_id: String::new(),
            cache_size_mb: None,
            cached: None,
            last_error: None,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    /// Strip fields that should never reach an unauthenticated reader.
    /// Currently a no-op placeholder: `ModelRecord` carries no secrets
    /// itself (unlike `ApiKey`), but callers should funnel all public
    /// reads through this so future secret-bearing fields are covered.
    pub fn public_view(&self) -> ModelRecord {
        self.clone()
    }
}

/// A deploy request, validated against the [`Catalog`] before becoming a
/// [`ModelRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub abbr: Abbr,
    pub name: String,
    #[serde(rename = "type")]
    pub model_type: ModelType,
    #[serde(default)]
    pub quantization: Quantization,
    pub max_model_len: u32,
    pub gpu_memory_utilization: f32,
    #[serde(default = "default_max_num_seqs")]
    pub max_num_seqs: u32,
    pub gpu_device: u32,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_max_num_seqs() -> u32 {
    256
}

fn default_port() -> u16 {
    8000
}

impl Default for Quantization {
    fn default() -> Self {
        Quantization::None
    }
}

/// One entry in the read-only predefined catalog (`models.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub abbr: Abbr,
    pub name: String,
    #[serde(rename = "type")]
    pub model_type: ModelType,
    pub quantization: Quantization,
    pub max_model_len: u32,
    pub recommended_vram_mb: Option<u64>,
    pub recommended_gpu_memory_utilization: Option<f32>,
    pub description: String,
    /// The inference-engine container image to spawn for this model.
    #[serde(default = "default_inference_image")]
    pub image: String,
}

fn default_inference_image() -> String {
    "vllm/vllm-openai:latest".to_string()
}

/// The predefined catalog, loaded once at startup and held read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    entries: HashMap<Abbr, CatalogEntry>,
}

impl Catalog {
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Catalog {
            entries: entries.into_iter().map(|e| (e.abbr.clone(), e)).collect(),
        }
    }

    pub fn get(&self, abbr: &str) -> Option<&CatalogEntry> {
        self.entries.get(abbr)
    }

    pub fn contains(&self, abbr: &str) -> bool {
        self.entries.contains_key(abbr)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads the predefined catalog (`models.json`) from disk. A missing
    /// file is not an error: the catalog starts empty and every deploy
    /// is rejected as an unknown `abbr` until an operator populates it.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, CatalogLoadError> {
        if !path.exists() {
            return Ok(Catalog::default());
        }
        let contents = std::fs::read_to_string(path).map_err(CatalogLoadError::Io)?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&contents).map_err(CatalogLoadError::Parse)?;
        Ok(Catalog::from_entries(entries))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogLoadError {
    #[error("failed to read catalog file: {0}")]
    Io(std::io::Error),
    #[error("failed to parse catalog file: {0}")]
    Parse(serde_json::Error),
}

/// `[a-z0-9._-]+`, non-empty.
pub fn validate_abbr(abbr: &str) -> bool {
    !abbr.is_empty()
        && abbr
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbr_validation_rejects_uppercase_and_spaces() {
        assert!(validate_abbr("qwen1.5b"));
        assert!(validate_abbr("qwen-1_5.b"));
        assert!(!validate_abbr("Qwen"));
        assert!(!validate_abbr("qwen 1.5b"));
        assert!(!validate_abbr(""));
    }

    #[test]
    fn container_name_uses_reserved_prefix() {
        assert_eq!(ModelRecord::container_name_for("qwen1.5b"), "MIND_MODEL_qwen1.5b");
    }

    #[test]
    fn new_stopped_record_has_zero_progress_and_no_container_id() {
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
        let record = ModelRecord::new_stopped(&spec, 1_000);
        assert_eq!(record.status, ModelStatus::Stopped);
        assert_eq!(record.progress, 0);
        assert!(record.container_id.is_empty());
        assert_eq!(record.endpoint, "/api/v1/qwen1.5b");
    }
}
