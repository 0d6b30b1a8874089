//! Data shapes for the Auth Subsystem. The verification/minting logic
//! lives in `orchestrator::auth`; this module only holds what gets
//! persisted and what gets returned over HTTP.

use serde::{Deserialize, Serialize};

/// Stored record for a minted API key. `full_key` is never stored or
/// returned here — only its hash lives in the state store, keyed
/// separately (see `store::keys::apikey_key`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub prefix: String,
    pub name: String,
    pub description: String,
    pub created_at: i64,
    pub last_used_at: Option<i64>,
}

/// Returned exactly once, at creation time.
#[derive(Debug, Clone, Serialize)]
pub struct MintedApiKey {
    pub api_key: String,
    pub name: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub username: String,
    pub expires_at: i64,
}
