//! Flat string encoding of `ModelRecord` for storage as a Redis hash, per
//! §6's persisted state layout (`model:{abbr}` → hash of fields).

use common::error::{OrchestratorError, Result};
use common::model::{ModelRecord, ModelStatus, ModelType, Quantization};
use std::collections::HashMap;

pub fn to_fields(record: &ModelRecord) -> Vec<(String, String)> {
    vec![
        ("abbr".into(), record.abbr.clone()),
        ("name".into(), record.name.clone()),
        ("type".into(), model_type_str(record.model_type).into()),
        ("quantization".into(), quantization_str(record.quantization).into()),
        ("max_model_len".into(), record.max_model_len.to_string()),
        ("gpu_memory_utilization".into(), record.gpu_memory_utilization.to_string()),
        ("max_num_seqs".into(), record.max_num_seqs.to_string()),
        ("gpu_device".into(), record.gpu_device.to_string()),
        ("port".into(), record.port.to_string()),
        ("endpoint".into(), record.endpoint.clone()),
        ("status".into(), record.status.as_str().to_string()),
        ("progress".into(), record.progress.to_string()),
        ("progress_message".into(), record.progress_message.clone()),
        ("container_name".into(), record.container_name.clone()),
        ("container_id".into(), record.container_id.clone()),
        ("cache_size_mb".into(), opt_to_string(record.cache_size_mb)),
        ("cached".into(), opt_bool_to_string(record.cached)),
        ("last_error".into(), record.last_error.clone().unwrap_or_default()),
        ("created_at".into(), record.created_at.to_string()),
        ("updated_at".into(), record.updated_at.to_string()),
    ]
}

pub fn from_fields(abbr: &str, fields: &HashMap<String, String>) -> Result<ModelRecord> {
    let get = |k: &str| -> Result<&String> {
        fields
            .get(k)
            .ok_or_else(|| OrchestratorError::Internal(format!("model:{abbr} missing field {k}")))
    };
    let parse = |k: &str| -> Result<u64> {
        get(k)?
            .parse()
            .map_err(|_| OrchestratorError::Internal(format!("model:{abbr} bad field {k}")))
    };

    Ok(ModelRecord {
        abbr: abbr.to_string(),
        name: get("name")?.clone(),
        model_type: parse_model_type(get("type")?)?,
        quantization: parse_quantization(get("quantization")?)?,
        max_model_len: parse("max_model_len")? as u32,
        gpu_memory_utilization: get("gpu_memory_utilization")?
            .parse()
            .map_err(|_| OrchestratorError::Internal("bad gpu_memory_utilization".into()))?,
        max_num_seqs: parse("max_num_seqs")? as u32,
        gpu_device: parse("gpu_device")? as u32,
        port: parse("port")? as u16,
        endpoint: get("endpoint")?.clone(),
        status: parse_status(get("status")?)?,
        progress: parse("progress")? as u8,
        progress_message: get("progress_message")?.clone(),
        container_name: get("container_name")?.clone(),
        container_id: get("container_id")?.clone(),
        cache_size_mb: get("cache_size_mb").ok().and_then(|s| s.parse().ok()),
        cached: get("cached").ok().and_then(|s| match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }),
        last_error: get("last_error").ok().filter(|s| !s.is_empty()).cloned(),
        created_at: get("created_at")?
            .parse()
            .map_err(|_| OrchestratorError::Internal("bad created_at".into()))?,
        updated_at: get("updated_at")?
            .parse()
            .map_err(|_| OrchestratorError::Internal("bad updated_at".into()))?,
    })
}

fn opt_to_string(v: Option<u64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}

fn opt_bool_to_string(v: Option<bool>) -> String {
    match v {
        Some(true) => "true".into(),
        Some(false) => "false".into(),
        None => String::new(),
    }
}

fn model_type_str(t: ModelType) -> &'static str {
    match t {
        ModelType::Llm => "llm",
        ModelType::Embedding => "embedding",
    }
}

fn parse_model_type(s: &str) -> Result<ModelType> {
    match s {
        "llm" => Ok(ModelType::Llm),
        "embedding" => Ok(ModelType::Embedding),
        other => Err(OrchestratorError::Internal(format!("unknown model type {other}"))),
    }
}

fn quantization_str(q: Quantization) -> &'static str {
    match q {
        Quantization::None => "none",
        Quantization::Awq => "awq",
        Quantization::Gptq => "gptq",
    }
}

fn parse_quantization(s: &str) -> Result<Quantization> {
    match s {
        "none" => Ok(Quantization::None),
        "awq" => Ok(Quantization::Awq),
        "gptq" => Ok(Quantization::Gptq),
        other => Err(OrchestratorError::Internal(format!("unknown quantization {other}"))),
    }
}

fn parse_status(s: &str) -> Result<ModelStatus> {
    match s {
        "stopped" => Ok(ModelStatus::Stopped),
        "deploying" => Ok(ModelStatus::Deploying),
        "running" => Ok(ModelStatus::Running),
        "error" => Ok(ModelStatus::Error),
        "stopping" => Ok(ModelStatus::Stopping),
        other => Err(OrchestratorError::Internal(format!("unknown status {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::ModelSpec;

    #[test]
    fn round_trips_through_flat_fields() {
        let spec = ModelSpec {
            abbr: "qwen1.5b".into(),
            name: "Qwen/Qwen2.5-1.5B-Instruct".into(),
            model_type: ModelType::Llm,
            quantization: Quantization::Awq,
            max_model_len: 2048,
            gpu_memory_utilization: 0.5,
            max_num_seqs: 256,
            gpu_device: 0,
            port: 8000,
        };
        let mut original = ModelRecord::new_stopped(&spec, 1000);
        original.last_error = Some("boom".into());
        original.cache_size_mb = Some(4096);
        original.cached = Some(true);

        let fields: HashMap<String, String> = to_fields(&original).into_iter().collect();
        let restored = from_fields(&original.abbr, &fields).unwrap();

        assert_eq!(restored.abbr, original.abbr);
        assert_eq!(restored.quantization, original.quantization);
        assert_eq!(restored.last_error, original.last_error);
        assert_eq!(restored.cache_size_mb, original.cache_size_mb);
        assert_eq!(restored.cached, original.cached);
    }
}
