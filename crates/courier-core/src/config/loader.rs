//! Layered configuration loader
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Built-in defaults
//! 2. Config file (`~/.courier/courier.yaml`, or `courier.yaml` in a custom directory)
//! 3. Environment variables (COURIER_* prefix)

use crate::error::{Error, Result};
use crate::types::{RetryPoliciesConfig, RuntimeConfig};
use camino::{Utf8Path, Utf8PathBuf};
use serde::de::DeserializeOwned;
use std::env;
use std::fs;

/// File name looked up inside the config directory
pub const CONFIG_FILE_NAME: &str = "courier.yaml";

/// Configuration loader
pub struct ConfigLoader {
    /// Base directory for configuration files
    config_dir: Utf8PathBuf,
}

impl ConfigLoader {
    /// Create a loader rooted at `~/.courier`
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// The directory this loader reads from
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    fn get_config_dir() -> Result<Utf8PathBuf> {
        Ok(Self::home_dir()?.join(".courier"))
    }

    /// Resolve the home directory, preferring `HOME` over the platform lookup
    fn home_dir() -> Result<Utf8PathBuf> {
        if let Ok(home) = env::var("HOME") {
            return Ok(Utf8PathBuf::from(home));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| Error::invalid_config("Could not determine home directory"))?;
        Utf8PathBuf::from_path_buf(home).map_err(|path| {
            Error::invalid_config(format!(
                "Home directory is not valid UTF-8: {}",
                path.display()
            ))
        })
    }

    /// Load runtime configuration with layered precedence
    pub fn load_runtime_config(&self) -> Result<RuntimeConfig> {
        let mut config = RuntimeConfig::default();

        let config_path = self.config_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            tracing::debug!(path = %config_path, "loading configuration file");
            let file_config = Self::load_yaml_file::<RuntimeConfig>(&config_path)?;
            config = Self::merge_runtime_config(config, file_config);
        }

        config = Self::apply_env_overrides(config)?;

        Ok(config)
    }

    /// Load a single YAML file without layering or overrides
    pub fn load_file(path: &Utf8Path) -> Result<RuntimeConfig> {
        if !path.exists() {
            return Err(Error::config_not_found(path.as_str()));
        }
        Self::load_yaml_file(path)
    }

    fn load_yaml_file<T: DeserializeOwned>(path: &Utf8Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let config: T = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    /// Merge two runtime configs (base is overridden by overlay)
    fn merge_runtime_config(base: RuntimeConfig, overlay: RuntimeConfig) -> RuntimeConfig {
        RuntimeConfig {
            retry_policies: Self::merge_retry_policies(base.retry_policies, overlay.retry_policies),
        }
    }

    fn merge_retry_policies(
        mut base: RetryPoliciesConfig,
        overlay: RetryPoliciesConfig,
    ) -> RetryPoliciesConfig {
        for (key, policy) in overlay.operations {
            base.operations.insert(key, policy);
        }
        base.default = overlay.default;
        base
    }

    /// Apply environment variable overrides to the default retry policy
    fn apply_env_overrides(mut config: RuntimeConfig) -> Result<RuntimeConfig> {
        let policy = &mut config.retry_policies.default;

        if let Ok(val) = env::var("COURIER_RETRY_MAX_ATTEMPTS") {
            policy.max_attempts = val.parse().map_err(|_| {
                Error::invalid_config("COURIER_RETRY_MAX_ATTEMPTS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("COURIER_RETRY_STRATEGY") {
            policy.strategy = val.parse().map_err(Error::invalid_config)?;
        }

        if let Ok(val) = env::var("COURIER_RETRY_INITIAL_DELAY_MS") {
            policy.initial_delay_ms = val.parse().map_err(|_| {
                Error::invalid_config("COURIER_RETRY_INITIAL_DELAY_MS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("COURIER_RETRY_MAX_DELAY_MS") {
            policy.max_delay_ms = val.parse().map_err(|_| {
                Error::invalid_config("COURIER_RETRY_MAX_DELAY_MS must be a valid number")
            })?;
        }

        Ok(config)
    }
}
