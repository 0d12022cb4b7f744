//! Session configuration with validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Origin trust configuration
    pub origins: OriginConfig,
    /// Child relay configuration
    pub relay: RelayConfig,
    /// Pre-handshake queue configuration
    pub queue: QueueConfig,
    /// First correlation id handed out by a session
    pub id_base: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            origins: OriginConfig::default(),
            relay: RelayConfig::default(),
            queue: QueueConfig::default(),
            id_base: 0,
        }
    }
}

impl BridgeConfig {
    /// Parse a JSON configuration document and validate it.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for origin in &self.origins.additional {
            if !origin.starts_with("https://") {
                return Err(ConfigError::InvalidOrigin(origin.clone()));
            }
        }

        if self.queue.max_pending_messages == Some(0) {
            return Err(ConfigError::InvalidLimit(
                "max_pending_messages cannot be 0".into(),
            ));
        }

        if self.id_base > u64::MAX / 2 {
            return Err(ConfigError::InvalidLimit(
                "id_base leaves no room for id allocation".into(),
            ));
        }

        Ok(())
    }
}

/// Origin trust configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Trusted origins added to the built-in list for every session
    pub additional: Vec<String>,
    /// Trust the built-in pre-production and test hosts
    pub allow_pre_production: bool,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            additional: Vec::new(),
            allow_pre_production: true,
        }
    }
}

/// Child relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Forward child requests with no local handler to the parent
    pub forward_unhandled_to_parent: bool,
    /// Re-broadcast parent requests with no local handler to children
    pub forward_unhandled_to_children: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            forward_unhandled_to_parent: true,
            forward_unhandled_to_children: true,
        }
    }
}

/// Pre-handshake queue configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Upper bound on queued messages; `None` is unbounded
    pub max_pending_messages: Option<usize>,
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid trusted origin (must be https): {0}")]
    InvalidOrigin(String),

    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}
