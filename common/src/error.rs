//! The error taxonomy shared by every component. Kinds, not exception
//! hierarchies: the HTTP layer maps [`ErrorKind`] to a status code via a
//! single table in `api::error`, so this module never imports `axum`.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    NotFound,
    Conflict,
    ResourceExhausted,
    Upstream,
    ContextOverflow,
    Internal,
}

#[derive(Debug, Error, Clone)]
pub enum OrchestratorError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication failed")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("context window overflow: {0}")]
    ContextOverflow(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::Validation(_) => ErrorKind::Validation,
            OrchestratorError::Unauthorized => ErrorKind::Auth,
            OrchestratorError::NotFound(_) => ErrorKind::NotFound,
            OrchestratorError::Conflict(_) => ErrorKind::Conflict,
            OrchestratorError::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            OrchestratorError::Upstream(_) => ErrorKind::Upstream,
            OrchestratorError::ContextOverflow(_) => ErrorKind::ContextOverflow,
            OrchestratorError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        OrchestratorError::Internal(msg.into())
    }
}

impl From<anyhow::Error> for OrchestratorError {
    fn from(e: anyhow::Error) -> Self {
        OrchestratorError::Internal(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Retry policy for transient failures, per §7 ("retried up to 3 times
/// with 2s backoff before becoming terminal").
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: std::time::Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            backoff: std::time::Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Runs `op` up to `max_attempts` times, sleeping `backoff` between
    /// attempts, returning the last error if every attempt fails.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.max_attempts => {
                    tracing::warn!(attempt, max = self.max_attempts, error = %e, "transient failure, retrying");
                    tokio::time::sleep(self.backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retry_policy_gives_up_after_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff: std::time::Duration::from_millis(1),
        };
        let calls = AtomicU32::new(0);
        let result: Result<()> = policy
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(OrchestratorError::Upstream("down".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_policy_returns_first_success() {
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff: std::time::Duration::from_millis(1),
        };
        let calls = AtomicU32::new(0);
        let result = policy
            .run(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(OrchestratorError::Upstream("flaky".into()))
                } else {
                    Ok(42)
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 42);
    }
}
