//! Environment-driven configuration, per §6. Loaded once at startup and
//! passed down by reference — this is the only place `std::env` is read.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub nginx_port: u16,
    pub auth_username: String,
    pub auth_password_hash: String,
    pub jwt_secret: String,
    pub session_timeout_hours: i64,
    pub hf_token: Option<String>,
    pub redis_host: String,
    pub redis_port: u16,
    pub environment: Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

impl Config {
    /// Reads configuration from the process environment. `AUTH_USERNAME`
    /// and `AUTH_PASSWORD_HASH` and `JWT_SECRET` are required; everything
    /// else has a documented default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let auth_username =
            env::var("AUTH_USERNAME").map_err(|_| ConfigError::Missing("AUTH_USERNAME"))?;
        let auth_password_hash = env::var("AUTH_PASSWORD_HASH")
            .map_err(|_| ConfigError::Missing("AUTH_PASSWORD_HASH"))?;
        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                value: "must be at least 32 bytes".into(),
            });
        }

        let nginx_port = env_or("NGINX_PORT", 8080u16)?;
        let session_timeout_hours = env_or("SESSION_TIMEOUT", 24i64)?;
        let redis_host = env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".into());
        let redis_port = env_or("REDIS_PORT", 6379u16)?;
        let hf_token = env::var("HF_TOKEN").ok();
        let environment = match env::var("ENVIRONMENT").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };

        Ok(Config {
            nginx_port,
            auth_username,
            auth_password_hash,
            jwt_secret,
            session_timeout_hours,
            hf_token,
            redis_host,
            redis_port,
            environment,
        })
    }
}

fn env_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(v) => v.parse().map_err(|_| ConfigError::Invalid { name, value: v }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn from_env_rejects_short_jwt_secret() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("AUTH_USERNAME", "admin");
        env::set_var("AUTH_PASSWORD_HASH", "pbkdf2_sha256:a:b:100000");
        env::set_var("JWT_SECRET", "short");
        let result = Config::from_env();
        assert!(matches!(result, Err(ConfigError::Invalid { name: "JWT_SECRET", .. })));
        env::remove_var("AUTH_USERNAME");
        env::remove_var("AUTH_PASSWORD_HASH");
        env::remove_var("JWT_SECRET");
    }

    #[test]
    fn from_env_defaults_redis_host_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var("REDIS_HOST");
        env::set_var("AUTH_USERNAME", "admin");
        env::set_var("AUTH_PASSWORD_HASH", "pbkdf2_sha256:a:b:100000");
        env::set_var("JWT_SECRET", "0123456789012345678901234567890123");
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.redis_host, "127.0.0.1");
        assert_eq!(cfg.redis_port, 6379);
        env::remove_var("AUTH_USERNAME");
        env::remove_var("AUTH_PASSWORD_HASH");
        env::remove_var("JWT_SECRET");
    }
}
