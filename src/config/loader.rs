//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::{LogFormat, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: defaults, then the optional TOML file, then the
/// process environment. The result is validated.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an explicit variable lookup.
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServiceConfig::default(),
    };

    apply_env(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`.
pub fn apply_env<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env(&lookup);

    env.string("NODE_ENV", &mut config.environment);
    env.parse("PORT", &mut config.listener.port)?;

    let db = &mut config.database;
    env.string("DB_USER", &mut db.user);
    env.string("DB_PASSWORD", &mut db.password);
    env.string("DB_HOST", &mut db.host);
    env.parse("DB_PORT", &mut db.port)?;
    env.string("DB_NAME", &mut db.name);
    env.parse("DB_POOL_MAX", &mut db.max_connections)?;
    env.parse("DB_IDLE_TIMEOUT_MS", &mut db.idle_timeout_ms)?;
    env.parse("DB_CONNECTION_TIMEOUT_MS", &mut db.connection_timeout_ms)?;
    env.parse("DB_WATCH_INTERVAL_SECS", &mut db.watch_interval_secs)?;

    let cache = &mut config.cache;
    if let Some(url) = env.get("REDIS_URL") {
        cache.url = Some(url);
    }
    env.string("REDIS_HOST", &mut cache.host);
    env.parse("REDIS_PORT", &mut cache.port)?;
    env.parse("REDIS_CONNECT_TIMEOUT_MS", &mut cache.connect_timeout_ms)?;
    env.parse("REDIS_COMMAND_TIMEOUT_MS", &mut cache.command_timeout_ms)?;
    env.parse("REDIS_HEARTBEAT_INTERVAL_SECS", &mut cache.heartbeat_interval_secs)?;

    env.parse("STARTUP_MAX_RETRIES", &mut config.startup.max_retries)?;
    env.parse("STARTUP_RETRY_DELAY_MS", &mut config.startup.retry_delay_ms)?;
    env.parse("SHUTDOWN_TIMEOUT_SECS", &mut config.shutdown.drain_timeout_secs)?;
    env.parse("REQUEST_TIMEOUT_SECS", &mut config.timeouts.request_secs)?;

    let obs = &mut config.observability;
    env.string("LOG_LEVEL", &mut obs.log_level);
    if let Some(format) = env.get("LOG_FORMAT") {
        obs.log_format = match format.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "text" | "pretty" => LogFormat::Text,
            _ => {
                return Err(ConfigError::InvalidEnv {
                    key: "LOG_FORMAT",
                    value: format,
                })
            }
        };
    }
    env.parse("METRICS_ENABLED", &mut obs.metrics_enabled)?;
    env.string("METRICS_ADDRESS", &mut obs.metrics_address);

    Ok(())
}

struct Env<'a, F>(&'a F);

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-empty value for `key`.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, target: &mut String) {
        if let Some(value) = self.get(key) {
            *target = value;
        }
    }

    fn parse<T: FromStr>(&self, key: &'static str, target: &mut T) -> Result<(), ConfigError> {
        if let Some(value) = self.get(key) {
            *target = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { key, value })?;
        }
        Ok(())
    }
}
