//! Process configuration
//!
//! One JSON document with a section per component. Every section and field
//! is optional and falls back to the component's defaults.

use dealroom_cache::CacheConfig;
use dealroom_gateway::GatewayConfig;
use dealroom_reconciler::ReconcilerConfig;
use dealroom_session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DealroomConfig {
    pub cache: CacheConfig,
    pub reconciler: ReconcilerConfig,
    pub session: SessionConfig,
    pub gateway: GatewayConfig,
}

impl DealroomConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.max_connections_per_user == 0 {
            return Err(ConfigError::Invalid(
                "session.max_connections_per_user must be at least 1".into(),
            ));
        }
        if self.session.message_limit == 0 {
            return Err(ConfigError::Invalid(
                "session.message_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<DealroomConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

pub fn load_config_from_str(json: &str) -> Result<DealroomConfig, ConfigError> {
    let config: DealroomConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Load the embedded default configuration
pub fn load_default_config() -> Result<DealroomConfig, ConfigError> {
    load_config_from_str(include_str!("dealroom.json"))
}
