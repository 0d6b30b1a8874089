//! Metrics descriptions and recording helpers, shared by `orchestrator` and
//! `api`. Uses the `metrics` facade only; the exporter (and the global
//! recorder install) lives at the binary edge (`server`), mirroring how the
//! teacher's `telemetry::metrics` module stays exporter-agnostic.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Registers metric descriptions. Call once at startup, before the first
/// `record_*` call, so `/orchestrator/metrics` carries HELP text.
pub fn init_metrics() {
    describe_counter!("mind_deploys_total", "Total deploy attempts, by outcome");
    describe_counter!("mind_chat_requests_total", "Total chat-completion requests, by abbr");
    describe_counter!("mind_chat_truncations_total", "Chat requests that required context truncation");
    describe_histogram!("mind_deploy_duration_seconds", "Wall-clock time from deploy start to running or error");
    describe_histogram!("mind_chat_estimated_tokens", "Estimated input token count per chat request");
    describe_gauge!("mind_gpu_memory_used_mb", "Last-sampled GPU memory in use, by GPU index");
    describe_gauge!("mind_models_running", "Number of model records currently in status=running");
}

pub fn record_deploy_outcome(abbr: &str, outcome: &str, duration_secs: f64) {
    counter!("mind_deploys_total", "abbr" => abbr.to_string(), "outcome" => outcome.to_string()).increment(1);
    histogram!("mind_deploy_duration_seconds", "outcome" => outcome.to_string()).record(duration_secs);
}

pub fn record_chat_request(abbr: &str, estimated_tokens: u32, truncated: bool) {
    counter!("mind_chat_requests_total", "abbr" => abbr.to_string()).increment(1);
    histogram!("mind_chat_estimated_tokens", "abbr" => abbr.to_string()).record(estimated_tokens as f64);
    if truncated {
        counter!("mind_chat_truncations_total", "abbr" => abbr.to_string()).increment(1);
    }
}

pub fn record_gpu_sample(index: u32, memory_used_mb: u64) {
    gauge!("mind_gpu_memory_used_mb", "gpu" => index.to_string()).set(memory_used_mb as f64);
}

pub fn record_models_running(count: usize) {
    gauge!("mind_models_running").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_helpers_do_not_panic_without_an_installed_recorder() {
        init_metrics();
        record_deploy_outcome("qwen1.5b", "running", 12.5);
        record_chat_request("qwen1.5b", 256, true);
        record_gpu_sample(0, 4096);
        record_models_running(3);
    }
}
