use common::error::OrchestratorError;
use thiserror::Error;

/// The Container Supervisor's own failure classification (§4.1), kept
/// distinct from `OrchestratorError` so callers can match on the exact
/// cause before it gets folded into the generic taxonomy.
#[derive(Debug, Error, Clone)]
pub enum RuntimeError {
    #[error("image not found: {0}")]
    ImageMissing(String),
    #[error("port already in use: {0}")]
    PortConflict(u16),
    #[error("GPU {0} unavailable")]
    GpuUnavailable(u32),
    #[error("container quota exceeded")]
    QuotaExceeded,
    #[error("container runtime not reachable")]
    RuntimeDown,
    #[error("container not found: {0}")]
    NotFound(String),
    #[error("readiness deadline exceeded for {0}")]
    ReadinessTimeout(String),
    #[error("container runtime error: {0}")]
    Other(String),
}

impl From<RuntimeError> for OrchestratorError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::NotFound(s) => OrchestratorError::NotFound(s),
            RuntimeError::PortConflict(_)
            | RuntimeError::GpuUnavailable(_)
            | RuntimeError::QuotaExceeded
            | RuntimeError::RuntimeDown => OrchestratorError::ResourceExhausted(e.to_string()),
            RuntimeError::ImageMissing(_) => OrchestratorError::Validation(e.to_string()),
            RuntimeError::ReadinessTimeout(_) => OrchestratorError::Upstream(e.to_string()),
            RuntimeError::Other(s) => OrchestratorError::Internal(s),
        }
    }
}
