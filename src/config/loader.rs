//! Configuration Loader
//!
//! Environment-aware configuration loading. Merges an optional base YAML
//! file, an optional environment-specific overlay, and `RELAY_`-prefixed
//! environment variables; missing files fall back to defaults so embedding
//! hosts without a config directory still get a working setup.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::{Config, Environment, File};
use tracing::debug;

use super::{ConfigurationError, RelayConfig};

const BASE_CONFIG_FILE: &str = "relay-config.yaml";

/// Loaded configuration together with where and how it was loaded
#[derive(Debug)]
pub struct ConfigManager {
    config: RelayConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> Result<Arc<ConfigManager>, ConfigurationError> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(
        config_dir: Option<PathBuf>,
    ) -> Result<Arc<ConfigManager>, ConfigurationError> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with an explicit
    /// environment. Useful for testing without modifying global
    /// environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> Result<Arc<ConfigManager>, ConfigurationError> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let env_config_file = format!("relay-config.{environment}.yaml");

        let config: RelayConfig = Config::builder()
            .add_source(File::from(config_directory.join(BASE_CONFIG_FILE)).required(false))
            .add_source(File::from(config_directory.join(env_config_file)).required(false))
            .add_source(Environment::with_prefix("RELAY").separator("__"))
            .build()
            .map_err(|err| ConfigurationError::Load(err.to_string()))?
            .try_deserialize()
            .map_err(|err| ConfigurationError::Load(err.to_string()))?;

        config.validate()?;

        debug!(
            environment = environment,
            states = config.readiness.state_chain.len(),
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment: RELAY_ENV || APP_ENV || 'development'
    fn detect_environment() -> String {
        env::var("RELAY_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }
}
