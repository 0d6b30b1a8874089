//! Key naming, per §6's persisted state layout.

pub fn model_key(abbr: &str) -> String {
    format!("model:{abbr}")
}

pub fn gpu_assignment_key(abbr: &str) -> String {
    format!("gpu_assignment:{abbr}")
}

pub fn apikey_key(hash: &str) -> String {
    format!("apikey:{hash}")
}

pub const MODEL_INDEX_KEY: &str = "model:index";
pub const APIKEY_INDEX_KEY: &str = "apikey:index";
