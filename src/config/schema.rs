//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files; every
//! field has a default so an empty file (or no file) is a valid config.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Deployment environment label reported by `GET /`.
    pub environment: String,

    /// Listener configuration.
    pub listener: ListenerConfig,

    /// PostgreSQL connection settings.
    pub database: DatabaseConfig,

    /// Redis connection settings.
    pub cache: CacheConfig,

    /// Bounded retry applied to both connectors at startup.
    pub startup: StartupConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Request timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            listener: ListenerConfig::default(),
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            startup: StartupConfig::default(),
            shutdown: ShutdownConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind.
    pub host: String,

    /// TCP port.
    pub port: u16,
}

impl ListenerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// PostgreSQL connection and pool configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub name: String,

    /// Maximum pooled connections.
    pub max_connections: u32,

    /// Idle connections are closed after this many milliseconds.
    pub idle_timeout_ms: u64,

    /// Upper bound on acquiring a connection, in milliseconds.
    pub connection_timeout_ms: u64,

    /// How often the pool watcher validates an idle connection after startup.
    pub watch_interval_secs: u64,
}

impl DatabaseConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            host: "postgres".to_string(),
            port: 5432,
            name: "koronet_db".to_string(),
            max_connections: 10,
            idle_timeout_ms: 30_000,
            connection_timeout_ms: 2_000,
            watch_interval_secs: 30,
        }
    }
}

// Hand-written so the password never reaches the logs.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("max_connections", &self.max_connections)
            .field("idle_timeout_ms", &self.idle_timeout_ms)
            .field("connection_timeout_ms", &self.connection_timeout_ms)
            .field("watch_interval_secs", &self.watch_interval_secs)
            .finish()
    }
}

/// Redis connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Full connection URL; takes precedence over `host`/`port`.
    pub url: Option<String>,

    pub host: String,
    pub port: u16,

    /// Upper bound on a single connection attempt, in milliseconds.
    pub connect_timeout_ms: u64,

    /// Upper bound on waiting for a command reply, in milliseconds.
    pub command_timeout_ms: u64,

    /// Interval between liveness pings once connected.
    pub heartbeat_interval_secs: u64,

    /// Transport reconnect attempts before giving up for good.
    pub reconnect_max_attempts: u32,

    /// Reconnect delay grows by this step per attempt, in milliseconds.
    pub reconnect_step_ms: u64,

    /// Reconnect delay ceiling, in milliseconds.
    pub reconnect_max_delay_ms: u64,

    /// Key written and read back to validate a fresh connection.
    pub demo_key: String,

    /// Value stored under `demo_key`.
    pub demo_value: String,
}

impl CacheConfig {
    /// Connection URL, built from host and port when no URL is set.
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("redis://{}:{}", self.host, self.port),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "redis".to_string(),
            port: 6379,
            connect_timeout_ms: 5_000,
            command_timeout_ms: 2_000,
            heartbeat_interval_secs: 5,
            reconnect_max_attempts: 10,
            reconnect_step_ms: 100,
            reconnect_max_delay_ms: 3_000,
            demo_key: "koronet:message".to_string(),
            demo_value: "Hello from Redis!".to_string(),
        }
    }
}

/// Startup bootstrap retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Connection attempts per dependency before reporting it down.
    pub max_retries: u32,

    /// Fixed delay between attempts, in milliseconds.
    pub retry_delay_ms: u64,
}

impl StartupConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay_ms: 5_000,
        }
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Deadline for draining in-flight requests, in seconds.
    pub drain_timeout_secs: u64,
}

impl ShutdownConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 10,
        }
    }
}

/// Timeout configuration for request handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.listener.port, 3000);
        assert_eq!(config.environment, "development");
        assert_eq!(config.database.host, "postgres");
        assert_eq!(config.database.name, "koronet_db");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.connection_timeout(), Duration::from_secs(2));
        assert_eq!(config.startup.max_retries, 5);
        assert_eq!(config.startup.retry_delay(), Duration::from_secs(5));
        assert_eq!(config.cache.reconnect_max_attempts, 10);
    }

    #[test]
    fn test_cache_url_precedence() {
        let mut cache = CacheConfig::default();
        assert_eq!(cache.connection_url(), "redis://redis:6379");

        cache.host = "localhost".into();
        cache.port = 6380;
        assert_eq!(cache.connection_url(), "redis://localhost:6380");

        cache.url = Some("redis://cache.internal:7000/2".into());
        assert_eq!(cache.connection_url(), "redis://cache.internal:7000/2");
    }

    #[test]
    fn test_database_debug_hides_password() {
        let mut db = DatabaseConfig::default();
        db.password = "hunter2".into();
        let printed = format!("{:?}", db);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("***"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServiceConfig = toml::from_str(
            r#"
            environment = "staging"

            [listener]
            port = 8080

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.environment, "staging");
        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.listener.host, "0.0.0.0");
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.database.port, 5432);
    }
}
