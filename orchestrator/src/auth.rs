//! The Auth Subsystem (§4.6): operator session login and API key
//! issuance/verification. Two independent credential types share nothing
//! but the state store: sessions are HMAC-signed bearer tokens minted
//! against the single operator account from `Config`; API keys are
//! random secrets whose SHA-256 hash is the only thing ever persisted.

use common::auth::{ApiKey, MintedApiKey, SessionClaims};
use common::error::{OrchestratorError, Result};
use common::traits::StateStore;
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const API_KEY_PREFIX: &str = "mind_";
const API_KEY_RANDOM_LEN: usize = 32;

/// `pbkdf2_sha256:{salt_hex}:{hash_hex}:{iterations}`, matching
/// `AUTH_PASSWORD_HASH`'s documented format.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    let hash = pbkdf2_derive(password, &salt, PBKDF2_ITERATIONS);
    format!("pbkdf2_sha256:{}:{}:{}", hex::encode(salt), hex::encode(hash), PBKDF2_ITERATIONS)
}

pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parts: Vec<&str> = stored.split(':').collect();
    let [scheme, salt_hex, hash_hex, iterations] = parts[..] else {
        return Err(OrchestratorError::internal("malformed password hash"));
    };
    if scheme != "pbkdf2_sha256" {
        return Err(OrchestratorError::internal(format!("unsupported password hash scheme: {scheme}")));
    }
    let salt = hex::decode(salt_hex).map_err(|e| OrchestratorError::internal(e.to_string()))?;
    let expected = hex::decode(hash_hex).map_err(|e| OrchestratorError::internal(e.to_string()))?;
    let iterations: u32 = iterations.parse().map_err(|_| OrchestratorError::internal("bad iteration count"))?;
    let actual = pbkdf2_derive(password, &salt, iterations);
    Ok(constant_time_eq(&actual, &expected))
}

fn pbkdf2_derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// `{username}.{expires_at}.{hmac_hex}`. Opaque to the client; verified
/// by recomputing the HMAC over `username.expires_at` with the server
/// secret, never decoded client-side.
pub fn mint_session_token(username: &str, secret: &str, expires_at: i64) -> String {
    let payload = format!("{username}.{expires_at}");
    let sig = hmac_hex(secret, &payload);
    format!("{payload}.{sig}")
}

pub fn verify_session_token(token: &str, secret: &str) -> Result<SessionClaims> {
    let mut parts = token.rsplitn(2, '.');
    let sig = parts.next().ok_or(OrchestratorError::Unauthorized)?;
    let payload = parts.next().ok_or(OrchestratorError::Unauthorized)?;
    let expected = hmac_hex(secret, payload);
    if !constant_time_eq(sig.as_bytes(), expected.as_bytes()) {
        return Err(OrchestratorError::Unauthorized);
    }
    let mut payload_parts = payload.rsplitn(2, '.');
    let expires_at: i64 = payload_parts.next().ok_or(OrchestratorError::Unauthorized)?.parse().map_err(|_| OrchestratorError::Unauthorized)?;
    let username = payload_parts.next().ok_or(OrchestratorError::Unauthorized)?.to_string();

    if expires_at < common::time::now_ms() {
        return Err(OrchestratorError::Unauthorized);
    }
    Ok(SessionClaims { username, expires_at })
}

fn hmac_hex(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates a new API key secret (never persisted in plaintext) and its
/// SHA-256 hash (what actually gets stored and looked up).
pub fn mint_api_key() -> (String, String) {
    let mut random = [0u8; API_KEY_RANDOM_LEN];
    rand::rng().fill_bytes(&mut random);
    let full_key = format!("{API_KEY_PREFIX}{}", hex::encode(random));
    let hash = sha256_hex(&full_key);
    (full_key, hash)
}

/// Ties `common::auth` data shapes and the functions above to a
/// [`StateStore`], implementing Login / session verification / API key
/// issuance and revocation end to end (§4.6).
pub struct AuthService {
    store: Arc<dyn StateStore>,
    username: String,
    password_hash: String,
    jwt_secret: String,
    session_timeout_hours: i64,
}

impl AuthService {
    pub fn new(store: Arc<dyn StateStore>, username: String, password_hash: String, jwt_secret: String, session_timeout_hours: i64) -> Self {
        AuthService { store, username, password_hash, jwt_secret, session_timeout_hours }
    }

    pub fn login(&self, username: &str, password: &str) -> Result<String> {
        if username != self.username || !verify_password(password, &self.password_hash)? {
            return Err(OrchestratorError::Unauthorized);
        }
        let expires_at = common::time::now_ms() + self.session_timeout_hours * 3_600_000;
        Ok(mint_session_token(username, &self.jwt_secret, expires_at))
    }

    pub fn require_session(&self, token: &str) -> Result<SessionClaims> {
        verify_session_token(token, &self.jwt_secret)
    }

    /// Accepts either a `Bearer <token>` header value or a raw `X-API-Key`
    /// header value; both are the full key, never the stored hash.
    pub async fn require_key(&self, header_value: &str) -> Result<ApiKey> {
        let full_key = header_value.strip_prefix("Bearer ").unwrap_or(header_value).trim();
        let hash = sha256_hex(full_key);
        let key = self
            .store
            .get_api_key(&hash)
            .await?
            .ok_or(OrchestratorError::Unauthorized)?;
        self.store.touch_api_key(&hash, common::time::now_ms()).await?;
        Ok(key)
    }

    pub async fn create_api_key(&self, name: String, description: String) -> Result<MintedApiKey> {
        let (full_key, hash) = mint_api_key();
        let prefix = full_key.chars().take(8).collect::<String>();
        let record = ApiKey {
            prefix: prefix.clone(),
            name: name.clone(),
            description,
            created_at: common::time::now_ms(),
            last_used_at: None,
        };
        self.store.put_api_key(&hash, &record).await?;
        Ok(MintedApiKey { api_key: full_key, name, prefix })
    }

    pub async fn list_api_keys(&self) -> Result<Vec<(String, ApiKey)>> {
        self.store.list_api_keys().await
    }

    pub async fn delete_api_key(&self, key_or_prefix: &str) -> Result<()> {
        let hash = match self.store.find_api_key_hash_by_prefix(key_or_prefix).await? {
            Some(hash) => hash,
            None => sha256_hex(key_or_prefix),
        };
        if self.store.get_api_key(&hash).await?.is_none() {
            return Err(OrchestratorError::NotFound(format!("no such API key: {key_or_prefix}")));
        }
        self.store.delete_api_key(&hash).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::InMemoryStateStore;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(InMemoryStateStore::new()),
            "admin".to_string(),
            hash_password("correct-horse"),
            "0123456789abcdef0123456789abcdef".to_string(),
            24,
        )
    }

    #[test]
    fn password_round_trips() {
        let hash = hash_password("hunter2");
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn session_token_round_trips() {
        let expires_at = common::time::now_ms() + 60_000;
        let token = mint_session_token("admin", "secret", expires_at);
        let claims = verify_session_token(&token, "secret").unwrap();
        assert_eq!(claims.username, "admin");
    }

    #[test]
    fn session_token_rejects_tampered_signature() {
        let expires_at = common::time::now_ms() + 60_000;
        let mut token = mint_session_token("admin", "secret", expires_at);
        token.push('0');
        assert!(verify_session_token(&token, "secret").is_err());
    }

    #[test]
    fn session_token_rejects_expired_claims() {
        let expires_at = common::time::now_ms() - 1;
        let token = mint_session_token("admin", "secret", expires_at);
        assert!(verify_session_token(&token, "secret").is_err());
    }

    #[tokio::test]
    async fn login_succeeds_with_correct_credentials() {
        let auth = service();
        let token = auth.login("admin", "correct-horse").unwrap();
        let claims = auth.require_session(&token).unwrap();
        assert_eq!(claims.username, "admin");
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let auth = service();
        assert!(auth.login("admin", "wrong").is_err());
    }

    #[tokio::test]
    async fn api_key_created_then_used_then_deleted() {
        let auth = service();
        let minted = auth.create_api_key("ci".to_string(), "for ci runs".to_string()).await.unwrap();
        assert_eq!(minted.prefix.chars().count(), 8);
        let header = format!("Bearer {}", minted.api_key);
        let key = auth.require_key(&header).await.unwrap();
        assert_eq!(key.name, "ci");

        auth.delete_api_key(&minted.prefix).await.unwrap();
        assert!(auth.require_key(&header).await.is_err());
    }

    #[tokio::test]
    async fn deleting_an_unminted_key_is_not_found() {
        let auth = service();
        let err = auth.delete_api_key("sk_never_minted").await.unwrap_err();
        assert_eq!(err.kind(), common::ErrorKind::NotFound);
    }
}
