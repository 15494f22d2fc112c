//! PostgreSQL connector.
//!
//! # Responsibilities
//! - Own the connection pool
//! - Validate a pooled connection with `SELECT NOW()`
//! - Watch the pool after startup and report the first failure
//!
//! # Design Decisions
//! - The pool is lazy: it exists before the first attempt and every attempt
//!   reuses it
//! - A post-startup failure flips `database` down once; nothing retries

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;

use crate::config::DatabaseConfig;
use crate::connectors::{Connector, ConnectorError};
use crate::health::{HealthState, Subsystem};
use crate::lifecycle::signals::FatalReporter;

/// Pooled PostgreSQL connection.
pub struct DatabaseConnector {
    pool: PgPool,
    health: HealthState,
    watch_interval: Duration,
    closing: watch::Sender<bool>,
    reporter: FatalReporter,
}

impl DatabaseConnector {
    /// Build the (lazy) pool. No connection is opened here.
    pub fn new(config: &DatabaseConfig, health: HealthState, reporter: FatalReporter) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .idle_timeout(config.idle_timeout())
            .acquire_timeout(config.connection_timeout())
            .connect_lazy_with(options);

        tracing::debug!(
            host = %config.host,
            port = config.port,
            database = %config.name,
            max_connections = config.max_connections,
            "PostgreSQL pool created"
        );

        let (closing, _) = watch::channel(false);
        Self {
            pool,
            health,
            watch_interval: config.watch_interval(),
            closing,
            reporter,
        }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Connector for DatabaseConnector {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Database
    }

    async fn connect_once(&self) -> Result<(), ConnectorError> {
        let mut conn = self.pool.acquire().await?;
        let now: DateTime<Utc> = sqlx::query_scalar("SELECT NOW()")
            .fetch_one(&mut *conn)
            .await?;

        tracing::info!(server_time = %now, "Connected to PostgreSQL");
        Ok(())
    }

    fn on_connected(&self) {
        self.reporter.spawn_watched(
            "database-watcher",
            watch_pool(
                self.pool.clone(),
                self.health.clone(),
                self.watch_interval,
                self.closing.subscribe(),
            ),
        );
    }

    async fn close(&self) -> Result<(), ConnectorError> {
        self.closing.send_replace(true);
        self.pool.close().await;
        tracing::info!("PostgreSQL pool closed");
        Ok(())
    }
}

/// Validate an idle connection every `interval` until the first failure.
async fn watch_pool(
    pool: PgPool,
    health: HealthState,
    interval: Duration,
    mut closing: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    // The first tick completes immediately; startup just validated the pool.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = closing.wait_for(|closing| *closing) => break,
        }

        if pool.is_closed() {
            break;
        }

        match sqlx::query("SELECT 1").execute(&pool).await {
            Ok(_) => {}
            Err(sqlx::Error::PoolClosed) => break,
            Err(e) => {
                tracing::error!(error = %e, "Unexpected error on idle PostgreSQL connection");
                health.set_status(Subsystem::Database, false);
                break;
            }
        }
    }

    tracing::debug!("PostgreSQL pool watcher stopped");
}
