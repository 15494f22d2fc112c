//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, pool size > 0)
//! - Check the cache URL parses and uses a Redis scheme
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::ServiceConfig;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("cache url {url:?} is invalid: {reason}")]
    InvalidCacheUrl { url: String, reason: String },

    #[error("metrics address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check a fully layered configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut non_zero = |value: u64, field: &'static str| {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    };
    non_zero(config.database.max_connections.into(), "database.max_connections");
    non_zero(config.database.connection_timeout_ms, "database.connection_timeout_ms");
    non_zero(config.database.watch_interval_secs, "database.watch_interval_secs");
    non_zero(config.cache.connect_timeout_ms, "cache.connect_timeout_ms");
    non_zero(config.cache.command_timeout_ms, "cache.command_timeout_ms");
    non_zero(config.cache.heartbeat_interval_secs, "cache.heartbeat_interval_secs");
    non_zero(config.startup.max_retries.into(), "startup.max_retries");
    non_zero(config.timeouts.request_secs, "timeouts.request_secs");

    if config.database.host.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "database.host" });
    }
    if config.database.name.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "database.name" });
    }

    let cache_url = config.cache.connection_url();
    match Url::parse(&cache_url) {
        Ok(url) if matches!(url.scheme(), "redis" | "rediss") => {}
        Ok(url) => errors.push(ValidationError::InvalidCacheUrl {
            url: cache_url.clone(),
            reason: format!("unsupported scheme {:?}", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidCacheUrl {
            url: cache_url.clone(),
            reason: e.to_string(),
        }),
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
