//! Dependency connectors.
//!
//! # Data Flow
//! ```text
//! Lifecycle (startup.rs)
//!     → connect_with_retry()          bounded retry, fixed delay
//!         → Connector::connect_once() one attempt + validation query
//!     → HealthState::set_status()     up on success, down when exhausted
//!     → Connector::on_connected()     start post-startup error watching
//!
//! Lifecycle (shutdown.rs)
//!     → Connector::close()
//! ```
//!
//! # Design Decisions
//! - Startup failure is downgraded to a status flag, never fatal
//! - Each connector owns its own post-startup watching
//! - The database never recovers on its own; the cache reconnects a bounded
//!   number of times

pub mod cache;
pub mod database;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::config::StartupConfig;
use crate::health::{HealthState, Subsystem};
use crate::resilience::{retry, Backoff, RetryPolicy, TimeoutError};

pub use cache::CacheConnector;
pub use database::DatabaseConnector;

/// Errors raised while talking to a dependency.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("connection attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Unavailable(String),
}

impl<E> From<TimeoutError<E>> for ConnectorError
where
    E: Into<ConnectorError>,
{
    fn from(err: TimeoutError<E>) -> Self {
        match err {
            TimeoutError::Elapsed(limit) => ConnectorError::Timeout(limit),
            TimeoutError::Inner(e) => e.into(),
        }
    }
}

/// A dependency the service keeps a connection to.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Health flag this connector drives.
    fn subsystem(&self) -> Subsystem;

    /// A single connection attempt, including its validation round trip.
    async fn connect_once(&self) -> Result<(), ConnectorError>;

    /// Called once after a successful bootstrap.
    fn on_connected(&self) {}

    /// Release the connection. Called once during shutdown.
    async fn close(&self) -> Result<(), ConnectorError>;
}

/// Retry policy used by both connectors at startup.
pub fn startup_policy(config: &StartupConfig) -> RetryPolicy {
    RetryPolicy::new(config.max_retries, Backoff::Fixed(config.retry_delay()))
}

/// Bootstrap `connector`, reporting the outcome through `health`.
///
/// Returns whether the dependency came up. Never fails.
pub async fn connect_with_retry(
    connector: &dyn Connector,
    health: &HealthState,
    policy: &RetryPolicy,
) -> bool {
    let subsystem = connector.subsystem();
    tracing::info!(
        subsystem = %subsystem,
        max_attempts = policy.max_attempts,
        "Connecting to dependency"
    );

    match retry(policy, subsystem.as_str(), |_| connector.connect_once()).await {
        Ok(()) => {
            health.set_status(subsystem, true);
            tracing::info!(subsystem = %subsystem, "Dependency connected");
            connector.on_connected();
            true
        }
        Err(exhausted) => {
            health.set_status(subsystem, false);
            tracing::error!(
                subsystem = %subsystem,
                attempts = exhausted.attempts,
                error = %exhausted.last_error,
                "Dependency unavailable, giving up"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        watching: AtomicBool,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                watching: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Connector for Flaky {
        fn subsystem(&self) -> Subsystem {
            Subsystem::Database
        }

        async fn connect_once(&self) -> Result<(), ConnectorError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(ConnectorError::Unavailable(format!("refused ({call})")))
            } else {
                Ok(())
            }
        }

        fn on_connected(&self) {
            self.watching.store(true, Ordering::SeqCst);
        }

        async fn close(&self) -> Result<(), ConnectorError> {
            Ok(())
        }
    }

    fn quick(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Backoff::Fixed(Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_recovers_within_budget() {
        let health = HealthState::new();
        let connector = Flaky::new(3);

        assert!(connect_with_retry(&connector, &health, &quick(5)).await);
        assert!(health.snapshot().database);
        assert_eq!(connector.calls.load(Ordering::SeqCst), 4);
        assert!(connector.watching.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_exhausted_budget_reports_down() {
        let health = HealthState::new();
        let connector = Flaky::new(u32::MAX);

        assert!(!connect_with_retry(&connector, &health, &quick(5)).await);
        assert!(!health.snapshot().database);
        assert_eq!(connector.calls.load(Ordering::SeqCst), 5);
        assert!(!connector.watching.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_exhausted_connector_stays_down() {
        let health = HealthState::new();
        let mut events = health.subscribe();
        let connector = Flaky::new(u32::MAX);

        connect_with_retry(&connector, &health, &quick(2)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!health.snapshot().database);
        // Down → down is not a transition; nothing claimed the database came up.
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_startup_policy_from_config() {
        let policy = startup_policy(&StartupConfig::default());
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff, Backoff::Fixed(Duration::from_secs(5)));
    }

    #[test]
    fn test_timeout_error_conversion() {
        let err: ConnectorError =
            TimeoutError::<redis::RedisError>::Elapsed(Duration::from_secs(2)).into();
        assert!(matches!(err, ConnectorError::Timeout(d) if d == Duration::from_secs(2)));
    }
}
