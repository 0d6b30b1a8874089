//! An in-memory `StateStore` fake, per §9's "dynamic dispatch" guidance —
//! used by `orchestrator`'s and `api`'s integration tests in place of a
//! real Redis instance. Shape grounded in `appstate::state::AppState`'s
//! `DashMap`-keyed per-id maps.

use async_trait::async_trait;
use common::auth::ApiKey;
use common::error::Result;
use common::model::ModelRecord;
use common::traits::StateStore;
use dashmap::DashMap;

#[derive(Default)]
pub struct InMemoryStateStore {
    models: DashMap<String, ModelRecord>,
    api_keys: DashMap<String, ApiKey>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get_model(&self, abbr: &str) -> Result<Option<ModelRecord>> {
        Ok(self.models.get(abbr).map(|r| r.clone()))
    }

    async fn put_model(&self, record: &ModelRecord) -> Result<()> {
        self.models.insert(record.abbr.clone(), record.clone());
        Ok(())
    }

    async fn delete_model(&self, abbr: &str) -> Result<()> {
        self.models.remove(abbr);
        Ok(())
    }

    async fn list_models(&self) -> Result<Vec<ModelRecord>> {
        Ok(self.models.iter().map(|e| e.value().clone()).collect())
    }

    async fn put_api_key(&self, key_hash: &str, key: &ApiKey) -> Result<()> {
        self.api_keys.insert(key_hash.to_string(), key.clone());
        Ok(())
    }

    async fn get_api_key(&self, key_hash: &str) -> Result<Option<ApiKey>> {
        Ok(self.api_keys.get(key_hash).map(|k| k.clone()))
    }

    async fn touch_api_key(&self, key_hash: &str, now_ms: i64) -> Result<()> {
        if let Some(mut entry) = self.api_keys.get_mut(key_hash) {
            entry.last_used_at = Some(now_ms);
        }
        Ok(())
    }

    async fn delete_api_key(&self, key_hash: &str) -> Result<()> {
        self.api_keys.remove(key_hash);
        Ok(())
    }

    async fn list_api_keys(&self) -> Result<Vec<(String, ApiKey)>> {
        Ok(self.api_keys.iter().map(|e| (e.key().clone(), e.value().clone())).collect())
    }

    async fn find_api_key_hash_by_prefix(&self, prefix_or_hash: &str) -> Result<Option<String>> {
        if self.api_keys.contains_key(prefix_or_hash) {
            return Ok(Some(prefix_or_hash.to_string()));
        }
        Ok(self
            .api_keys
            .iter()
            .find(|e| e.value().prefix == prefix_or_hash)
            .map(|e| e.key().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::{ModelSpec, ModelType, Quantization};

    fn sample_record() -> ModelRecord {
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
        ModelRecord::new_stopped(&spec, 0)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryStateStore::new();
        let record = sample_record();
        store.put_model(&record).await.unwrap();
        let fetched = store.get_model("qwen1.5b").await.unwrap().unwrap();
        assert_eq!(fetched.abbr, "qwen1.5b");
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let store = InMemoryStateStore::new();
        store.put_model(&sample_record()).await.unwrap();
        store.delete_model("qwen1.5b").await.unwrap();
        assert!(store.get_model("qwen1.5b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn api_key_lookup_by_prefix() {
        let store = InMemoryStateStore::new();
        let key = ApiKey {
            prefix: "sk_abcd1234".into(),
            name: "k1".into(),
            description: String::new(),
            created_at: 0,
            last_used_at: None,
        };
        store.put_api_key("fullhash", &key).await.unwrap();
        let found = store.find_api_key_hash_by_prefix("sk_abcd1234").await.unwrap();
        assert_eq!(found.as_deref(), Some("fullhash"));
    }
}
