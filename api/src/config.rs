//! API-layer configuration: which ambient surfaces are mounted, independent
//! of `common::config::Config`'s orchestrator-wide settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub enable_swagger: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig { port: 8080, enable_cors: true, cors_origins: vec!["*".to_string()], enable_swagger: true }
    }
}

impl ApiConfig {
    pub fn production(port: u16, allowed_origins: Vec<String>) -> Self {
        ApiConfig { port, enable_swagger: false, cors_origins: allowed_origins, ..Default::default() }
    }

    pub fn development(port: u16) -> Self {
        ApiConfig { port, ..Default::default() }
    }
}
