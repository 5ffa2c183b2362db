//! # Relay Session
//!
//! A session owns one message bus and one readiness coordinator, built
//! from a validated configuration. The host creates and drops sessions
//! explicitly; there is no ambient global instance.

use crate::config::{ConfigManager, RelayConfig};
use crate::error::Result;
use crate::messaging::MessageBus;
use crate::readiness::{ReadinessCoordinator, StateChain};

/// One bus plus one coordinator, sharing a configuration
#[derive(Debug, Clone)]
pub struct RelaySession {
    config: RelayConfig,
    bus: MessageBus,
    coordinator: ReadinessCoordinator,
}

impl RelaySession {
    /// Build a session from a configuration, validating it first
    pub fn new(config: RelayConfig) -> Result<Self> {
        config.validate()?;

        let chain = StateChain::from_config(&config.readiness.state_chain)?;

        Ok(Self {
            bus: MessageBus::with_config(config.messaging.clone()),
            coordinator: ReadinessCoordinator::new(chain),
            config,
        })
    }

    /// Build a session from an already-loaded configuration manager
    pub fn from_manager(manager: &ConfigManager) -> Result<Self> {
        Self::new(manager.config().clone())
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn coordinator(&self) -> &ReadinessCoordinator {
        &self.coordinator
    }
}

impl Default for RelaySession {
    /// Session over the default configuration. The default configuration
    /// always validates.
    fn default() -> Self {
        Self {
            config: RelayConfig::default(),
            bus: MessageBus::new(),
            coordinator: ReadinessCoordinator::default(),
        }
    }
}
