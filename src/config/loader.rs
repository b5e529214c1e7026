//! Configuration Loader
//!
//! Layered loading built on the `config` crate: serde defaults, then an
//! optional TOML file, then `DEVFLOW_FETCH_*` environment variables. The
//! application environment and API base URL get their own well-known
//! variables on top.

use std::collections::HashMap;
use std::path::PathBuf;

use config::{Config, Environment, File};
use tracing::debug;

use super::{AppEnvironment, ConfigResult, FetchConfig};

/// Default location of the optional configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/devflow-fetch.toml";

/// Prefix of environment variables mapped onto [`FetchConfig`] fields
pub const ENV_PREFIX: &str = "DEVFLOW_FETCH";

/// Builder-style loader for [`FetchConfig`]
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_path: PathBuf,
    env_source: Option<HashMap<String, String>>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            env_source: None,
        }
    }

    /// Read the optional file from a different path
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Use an explicit variable map instead of the process environment
    ///
    /// Lets tests exercise overrides without mutating global state.
    pub fn with_env_source(mut self, vars: HashMap<String, String>) -> Self {
        self.env_source = Some(vars);
        self
    }

    pub fn load(&self) -> ConfigResult<FetchConfig> {
        debug!(
            config_path = %self.config_path.display(),
            "Loading fetch configuration"
        );

        let settings = Config::builder()
            .add_source(File::from(self.config_path.clone()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(self.env_source.clone()),
            )
            .build()?;

        let mut config: FetchConfig = settings.try_deserialize()?;

        if let Some(base_url) = self.var("DEVFLOW_API_BASE_URL") {
            config.api_base_url = base_url;
        }

        if let Some(name) = ["DEVFLOW_ENV", "APP_ENV", "NODE_ENV"]
            .iter()
            .find_map(|key| self.var(key))
        {
            config.environment = name.parse().unwrap_or(AppEnvironment::Development);
        }

        config.validate()?;

        debug!(
            environment = %config.environment,
            api_base_url = %config.api_base_url,
            timeout_ms = config.timeout_ms,
            cache_enabled = config.cache_enabled(),
            "Fetch configuration loaded"
        );

        Ok(config)
    }

    fn var(&self, key: &str) -> Option<String> {
        match &self.env_source {
            Some(vars) => vars.get(key).cloned(),
            None => std::env::var(key).ok(),
        }
        .filter(|value| !value.trim().is_empty())
    }
}
