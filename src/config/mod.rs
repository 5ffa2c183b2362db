//! # Configuration
//!
//! Typed configuration for the messaging bus and the readiness coordinator,
//! with serde defaults so an empty configuration file yields a working
//! setup. Loading from YAML files and environment variables lives in
//! [`loader`].

pub mod loader;

pub use loader::ConfigManager;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::init_states;
use crate::readiness::StateChain;

/// Errors raised while loading or validating configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("failed to load configuration: {0}")]
    Load(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub messaging: MessagingConfig,

    #[serde(default)]
    pub readiness: ReadinessConfig,
}

impl RelayConfig {
    /// Validate the configuration beyond what deserialization enforces
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        StateChain::from_config(&self.readiness.state_chain)
            .map_err(|err| ConfigurationError::Invalid(err.to_string()))?;

        Ok(())
    }
}

/// Message bus configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Log broadcasts that reached zero listeners, useful when wiring up
    /// new channels
    #[serde(default)]
    pub log_unhandled_broadcasts: bool,
}

/// Readiness coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Ordered state chain shared by all entities and features
    #[serde(default = "ReadinessConfig::default_state_chain")]
    pub state_chain: Vec<StateSpecConfig>,
}

impl ReadinessConfig {
    fn default_state_chain() -> Vec<StateSpecConfig> {
        vec![
            StateSpecConfig::new(init_states::SPAWNED, false),
            StateSpecConfig::new(init_states::DATA_AVAILABLE, false),
            StateSpecConfig::new(init_states::DATA_INITIALIZED, true),
            StateSpecConfig::new(init_states::GAMEPLAY_READY, true),
        ]
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            state_chain: Self::default_state_chain(),
        }
    }
}

/// One readiness state entry in configuration form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSpecConfig {
    pub tag: String,

    #[serde(default)]
    pub barrier: bool,
}

impl StateSpecConfig {
    fn new(tag: &str, barrier: bool) -> Self {
        Self {
            tag: tag.to_string(),
            barrier,
        }
    }
}
