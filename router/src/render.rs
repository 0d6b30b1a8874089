//! Pure template emission — no I/O. Kept separate from the file-writing
//! side so "emitting it twice yields byte-identical output" (§8) is
//! testable without a filesystem.

use common::model::{ModelRecord, ModelStatus};

const HEADER: &str = "# AUTO-GENERATED by the MIND orchestrator's router generator. Do not edit by hand.\n";

/// Emits the reverse-proxy include file for the given `orchestrator_port`
/// (where this process itself listens, for the context-mediated chat
/// endpoint) from whichever records are `running`. Non-running records
/// are silently skipped — callers should already have filtered, but this
/// makes the function safe to call with an unfiltered list too.
pub fn render(records: &[ModelRecord], orchestrator_port: u16) -> String {
    let mut running: Vec<&ModelRecord> = records.iter().filter(|r| r.status == ModelStatus::Running).collect();
    running.sort_by(|a, b| a.abbr.cmp(&b.abbr));

    let mut out = String::from(HEADER);
    for record in running {
        out.push_str(&block(record, orchestrator_port));
    }
    out
}

fn block(record: &ModelRecord, orchestrator_port: u16) -> String {
    let abbr = &record.abbr;
    format!(
        "location /api/v1/{abbr}/chat/completions {{\n\
        \x20   proxy_pass http://127.0.0.1:{orchestrator_port}/api/v1/{abbr}/chat/completions;\n\
        \x20   add_header Access-Control-Allow-Origin * always;\n\
        \x20   if ($request_method = OPTIONS) {{ return 204; }}\n\
        \x20   proxy_buffering off;\n\
        \x20   proxy_http_version 1.1;\n\
        \x20   proxy_set_header Connection \"\";\n\
        \x20   proxy_read_timeout 300s;\n\
        \x20   proxy_send_timeout 300s;\n\
        }}\n\
        location /api/v1/{abbr}/ {{\n\
        \x20   proxy_pass http://{container}:{port}/v1/;\n\
        \x20   add_header Access-Control-Allow-Origin * always;\n\
        \x20   if ($request_method = OPTIONS) {{ return 204; }}\n\
        \x20   proxy_buffering off;\n\
        \x20   proxy_http_version 1.1;\n\
        \x20   proxy_set_header Connection \"\";\n\
        \x20   proxy_read_timeout 300s;\n\
        \x20   proxy_send_timeout 300s;\n\
        }}\n",
        container = record.container_name,
        port = record.port,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::{ModelSpec, ModelType, Quantization};

    fn running_record(abbr: &str) -> ModelRecord {
        let spec = ModelSpec {
            abbr: abbr.into(),
            name: format!("org/{abbr}"),
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
        record
    }

    #[test]
    fn renders_two_location_blocks_per_running_model() {
        let records = vec![running_record("qwen1.5b")];
        let out = render(&records, 9000);
        assert_eq!(out.matches("location").count(), 2);
        assert!(out.contains("/api/v1/qwen1.5b/chat/completions"));
        assert!(out.contains("http://MIND_MODEL_qwen1.5b:8000/v1/"));
    }

    #[test]
    fn skips_non_running_records() {
        let mut stopped = running_record("qwen1.5b");
        stopped.status = ModelStatus::Stopped;
        let out = render(&[stopped], 9000);
        assert_eq!(out, HEADER);
    }

    #[test]
    fn is_idempotent_and_sorted() {
        let records = vec![running_record("zeta"), running_record("alpha")];
        let first = render(&records, 9000);
        let second = render(&records, 9000);
        assert_eq!(first, second);
        assert!(first.find("alpha").unwrap() < first.find("zeta").unwrap());
    }
}
