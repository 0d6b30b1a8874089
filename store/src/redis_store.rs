//! The `redis`-backed `StateStore` implementation. Dependency choice
//! grounded in `other_examples/manifests/smoelius-litellm-rs/Cargo.toml`,
//! the only example in the pack that reaches for an external KV client
//! for exactly this kind of state.

use crate::{codec, keys};
use async_trait::async_trait;
use common::auth::ApiKey;
use common::error::{OrchestratorError, Result};
use common::model::ModelRecord;
use common::traits::StateStore;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;

pub struct RedisStateStore {
    conn: ConnectionManager,
}

impl RedisStateStore {
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let url = format!("redis://{host}:{port}");
        let client = redis::Client::open(url)
            .map_err(|e| OrchestratorError::Internal(format!("invalid redis url: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| OrchestratorError::Internal(format!("redis connection failed: {e}")))?;
        Ok(RedisStateStore { conn })
    }
}

fn map_err(op: &'static str) -> impl FnOnce(redis::RedisError) -> OrchestratorError {
    move |e| OrchestratorError::Internal(format!("redis {op} failed: {e}"))
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn get_model(&self, abbr: &str) -> Result<Option<ModelRecord>> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn
            .hgetall(keys::model_key(abbr))
            .await
            .map_err(map_err("HGETALL model"))?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(codec::from_fields(abbr, &fields)?))
    }

    async fn put_model(&self, record: &ModelRecord) -> Result<()> {
        let mut conn = self.conn.clone();
        let fields = codec::to_fields(record);
        let _: () = conn
            .hset_multiple(keys::model_key(&record.abbr), &fields)
            .await
            .map_err(map_err("HSET model"))?;
        let _: () = conn
            .set(keys::gpu_assignment_key(&record.abbr), record.gpu_device.to_string())
            .await
            .map_err(map_err("SET gpu_assignment"))?;
        let _: () = conn
            .sadd(keys::MODEL_INDEX_KEY, &record.abbr)
            .await
            .map_err(map_err("SADD model index"))?;
        Ok(())
    }

    async fn delete_model(&self, abbr: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(keys::model_key(abbr)).await.map_err(map_err("DEL model"))?;
        let _: () = conn
            .del(keys::gpu_assignment_key(abbr))
            .await
            .map_err(map_err("DEL gpu_assignment"))?;
        let _: () = conn
            .srem(keys::MODEL_INDEX_KEY, abbr)
            .await
            .map_err(map_err("SREM model index"))?;
        Ok(())
    }

    async fn list_models(&self) -> Result<Vec<ModelRecord>> {
        let mut conn = self.conn.clone();
        let abbrs: Vec<String> = conn
            .smembers(keys::MODEL_INDEX_KEY)
            .await
            .map_err(map_err("SMEMBERS model index"))?;
        let mut records = Vec::with_capacity(abbrs.len());
        for abbr in abbrs {
            if let Some(record) = self.get_model(&abbr).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn put_api_key(&self, key_hash: &str, key: &ApiKey) -> Result<()> {
        let mut conn = self.conn.clone();
        let fields = vec![
            ("name".to_string(), key.name.clone()),
            ("prefix".to_string(), key.prefix.clone()),
            ("description".to_string(), key.description.clone()),
            ("created_at".to_string(), key.created_at.to_string()),
            (
                "last_used_at".to_string(),
                key.last_used_at.map(|t| t.to_string()).unwrap_or_default(),
            ),
        ];
        let _: () = conn
            .hset_multiple(keys::apikey_key(key_hash), &fields)
            .await
            .map_err(map_err("HSET apikey"))?;
        let _: () = conn
            .sadd(keys::APIKEY_INDEX_KEY, key_hash)
            .await
            .map_err(map_err("SADD apikey index"))?;
        Ok(())
    }

    async fn get_api_key(&self, key_hash: &str) -> Result<Option<ApiKey>> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn
            .hgetall(keys::apikey_key(key_hash))
            .await
            .map_err(map_err("HGETALL apikey"))?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(ApiKey {
            prefix: fields.get("prefix").cloned().unwrap_or_default(),
            name: fields.get("name").cloned().unwrap_or_default(),
            description: fields.get("description").cloned().unwrap_or_default(),
            created_at: fields.get("created_at").and_then(|s| s.parse().ok()).unwrap_or(0),
            last_used_at: fields.get("last_used_at").and_then(|s| s.parse().ok()),
        }))
    }

    async fn touch_api_key(&self, key_hash: &str, now_ms: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset(keys::apikey_key(key_hash), "last_used_at", now_ms.to_string())
            .await
            .map_err(map_err("HSET apikey last_used_at"))?;
        Ok(())
    }

    async fn delete_api_key(&self, key_hash: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(keys::apikey_key(key_hash)).await.map_err(map_err("DEL apikey"))?;
        let _: () = conn
            .srem(keys::APIKEY_INDEX_KEY, key_hash)
            .await
            .map_err(map_err("SREM apikey index"))?;
        Ok(())
    }

    async fn list_api_keys(&self) -> Result<Vec<(String, ApiKey)>> {
        let mut conn = self.conn.clone();
        let hashes: Vec<String> = conn
            .smembers(keys::APIKEY_INDEX_KEY)
            .await
            .map_err(map_err("SMEMBERS apikey index"))?;
        let mut out = Vec::with_capacity(hashes.len());
        for hash in hashes {
            if let Some(key) = self.get_api_key(&hash).await? {
                out.push((hash, key));
            }
        }
        Ok(out)
    }

    async fn find_api_key_hash_by_prefix(&self, prefix_or_hash: &str) -> Result<Option<String>> {
        if self.get_api_key(prefix_or_hash).await?.is_some() {
            return Ok(Some(prefix_or_hash.to_string()));
        }
        for (hash, key) in self.list_api_keys().await? {
            if key.prefix == prefix_or_hash {
                return Ok(Some(hash));
            }
        }
        Ok(None)
    }
}
