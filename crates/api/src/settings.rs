//! Relay configuration
//!
//! Settings come from an optional file (`alert-relay.toml`, `.yaml` or
//! `.json`, or the path in `ALERT_RELAY_CONFIG`) overlaid with
//! `ALERT_RELAY__SECTION__KEY` environment variables.

use alerting::DebounceConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use notify::{LinkConfig, TelegramConfig};
use serde::Deserialize;

use crate::ApiError;

/// Environment variable naming the configuration file
pub const ENV_CONFIG_PATH: &str = "ALERT_RELAY_CONFIG";

const DEFAULT_CONFIG_NAME: &str = "alert-relay";
const ENV_PREFIX: &str = "ALERT_RELAY";

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete relay configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub debounce: DebounceConfig,
    pub telegram: TelegramConfig,
    pub links: LinkConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Load from the default file location and the environment
    pub fn load() -> Result<Self, ApiError> {
        let path = std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_NAME.to_string());
        Self::load_from(&path)
    }

    /// Load from `path` (extension optional, file optional) and the environment
    pub fn load_from(path: &str) -> Result<Self, ApiError> {
        Self::build(Config::builder().add_source(File::with_name(path).required(false)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ApiError> {
        let config: Self = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        config.debounce.validate()?;
        Ok(config)
    }
}
