//! Redis connector.
//!
//! # Responsibilities
//! - Open a multiplexed connection and validate it with a demo SET/GET
//! - Heartbeat the server after startup
//! - Reconnect on connection-level errors, a bounded number of times
//!
//! # Connection States
//! ```text
//! Disconnected → Connected:     bootstrap or reconnect succeeded (cache up)
//! Connected → Reconnecting:     command failed at the transport (cache down)
//! Reconnecting → Connected:     attempt n succeeded after min(n*step, max)
//! Reconnecting → GaveUp:        reconnect_max_attempts exhausted
//! ```
//!
//! # Design Decisions
//! - Transport reconnect is separate from the startup retry loop
//! - Every command has a reply deadline; a missed deadline is a connection event
//! - Command errors (wrong type, etc.) are not connection events
//! - GaveUp is terminal; only a restart brings the cache back

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncConnectionConfig, Client, RedisError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::time;
use url::Url;

use crate::config::CacheConfig;
use crate::connectors::{Connector, ConnectorError};
use crate::health::{HealthState, Subsystem};
use crate::lifecycle::signals::FatalReporter;
use crate::resilience::{with_timeout, Backoff};

/// Redis client with bounded automatic reconnection.
#[derive(Clone)]
pub struct CacheConnector {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    client: Client,
    config: CacheConfig,
    health: HealthState,
    connection: RwLock<Option<MultiplexedConnection>>,
    reconnecting: AtomicBool,
    gave_up: AtomicBool,
    closing: watch::Sender<bool>,
    reporter: FatalReporter,
}

impl std::fmt::Debug for CacheConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheConnector")
            .field("url", &redact_url(&self.inner.config.connection_url()))
            .field("reconnecting", &self.inner.reconnecting.load(Ordering::SeqCst))
            .field("gave_up", &self.inner.gave_up.load(Ordering::SeqCst))
            .finish()
    }
}

impl CacheConnector {
    /// Create the client. Fails only on an unparseable URL; no I/O happens.
    pub fn new(
        config: &CacheConfig,
        health: HealthState,
        reporter: FatalReporter,
    ) -> Result<Self, ConnectorError> {
        let url = config.connection_url();
        let client = Client::open(url.as_str())?;
        tracing::debug!(url = %redact_url(&url), "Redis client created");

        let (closing, _) = watch::channel(false);
        Ok(Self {
            inner: Arc::new(CacheInner {
                client,
                config: config.clone(),
                health,
                connection: RwLock::new(None),
                reconnecting: AtomicBool::new(false),
                gave_up: AtomicBool::new(false),
                closing,
                reporter,
            }),
        })
    }

    /// Store `value` under `key`.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), ConnectorError> {
        let mut conn = self.inner.current().await?;
        let result = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async::<()>(&mut conn)
            .await;
        self.inner.observe(result)
    }

    /// Read `key`.
    pub async fn get(&self, key: &str) -> Result<Option<String>, ConnectorError> {
        let mut conn = self.inner.current().await?;
        let result = redis::cmd("GET").arg(key).query_async(&mut conn).await;
        self.inner.observe(result)
    }

    /// Round-trip a PING.
    pub async fn ping(&self) -> Result<(), ConnectorError> {
        let mut conn = self.inner.current().await?;
        let result = redis::cmd("PING").query_async::<String>(&mut conn).await;
        self.inner.observe(result).map(|_| ())
    }

    /// Whether a connection is currently held.
    pub async fn is_open(&self) -> bool {
        self.inner.connection.read().await.is_some()
    }

    /// Whether transport reconnection was abandoned.
    pub fn has_given_up(&self) -> bool {
        self.inner.gave_up.load(Ordering::SeqCst)
    }
}

impl CacheInner {
    fn is_closing(&self) -> bool {
        *self.closing.borrow()
    }

    async fn open(&self) -> Result<MultiplexedConnection, ConnectorError> {
        let options =
            AsyncConnectionConfig::new().set_response_timeout(self.config.command_timeout());
        let conn = with_timeout(
            self.config.connect_timeout(),
            self.client.get_multiplexed_async_connection_with_config(&options),
        )
        .await?;
        Ok(conn)
    }

    async fn current(&self) -> Result<MultiplexedConnection, ConnectorError> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or_else(|| ConnectorError::Unavailable("Redis connection is not open".into()))
    }

    /// Pass `result` through, treating transport failures as error events.
    fn observe<T>(self: &Arc<Self>, result: Result<T, RedisError>) -> Result<T, ConnectorError> {
        result.map_err(|e| {
            if is_connection_error(&e) {
                self.connection_lost(&e);
            }
            e.into()
        })
    }

    fn connection_lost(self: &Arc<Self>, err: &RedisError) {
        if self.is_closing() {
            return;
        }

        tracing::error!(error = %err, "Redis client error");
        self.health.set_status(Subsystem::Cache, false);

        if self.gave_up.load(Ordering::SeqCst) {
            return;
        }
        if self
            .reconnecting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            // Subscribe before spawning so a close issued meanwhile is seen.
            let closing = self.closing.subscribe();
            self.reporter
                .spawn_watched("cache-reconnect", reconnect(Arc::clone(self), closing));
        }
    }
}

fn is_connection_error(err: &RedisError) -> bool {
    err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout()
        || err.is_unrecoverable_error()
}

/// Transport-level reconnect: attempt `n` waits `min(n * step, max)` first.
async fn reconnect(inner: Arc<CacheInner>, mut closing: watch::Receiver<bool>) {
    *inner.connection.write().await = None;

    let backoff = Backoff::Linear {
        step: time::Duration::from_millis(inner.config.reconnect_step_ms),
        max: time::Duration::from_millis(inner.config.reconnect_max_delay_ms),
    };
    let max_attempts = inner.config.reconnect_max_attempts;

    for attempt in 1..=max_attempts {
        let delay = backoff.delay_for(attempt);
        tokio::select! {
            _ = time::sleep(delay) => {}
            _ = closing.wait_for(|closing| *closing) => break,
        }
        if inner.is_closing() {
            break;
        }

        match inner.open().await {
            Ok(conn) => {
                let mut slot = inner.connection.write().await;
                if inner.is_closing() {
                    break;
                }
                *slot = Some(conn);
                drop(slot);
                inner.reconnecting.store(false, Ordering::SeqCst);
                inner.health.set_status(Subsystem::Cache, true);
                tracing::info!(attempt, "Reconnected to Redis");
                return;
            }
            Err(e) => {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Redis reconnect attempt failed"
                );
            }
        }
    }

    if !inner.is_closing() {
        tracing::error!(attempts = max_attempts, "Redis: too many reconnection attempts, giving up");
        inner.gave_up.store(true, Ordering::SeqCst);
    }
    inner.reconnecting.store(false, Ordering::SeqCst);
}

/// PING every heartbeat interval; failures feed the reconnect path.
async fn heartbeat(connector: CacheConnector, mut closing: watch::Receiver<bool>) {
    let mut ticker = time::interval(connector.inner.config.heartbeat_interval());
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = closing.wait_for(|closing| *closing) => break,
        }

        if connector.has_given_up() {
            break;
        }
        if connector.inner.reconnecting.load(Ordering::SeqCst) {
            continue;
        }
        if let Err(e) = connector.ping().await {
            tracing::debug!(error = %e, "Redis heartbeat failed");
        }
    }

    tracing::debug!("Redis heartbeat stopped");
}

#[async_trait]
impl Connector for CacheConnector {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Cache
    }

    async fn connect_once(&self) -> Result<(), ConnectorError> {
        let mut conn = self.inner.open().await?;
        tracing::info!("Connected to Redis");

        let key = &self.inner.config.demo_key;
        redis::cmd("SET")
            .arg(key)
            .arg(&self.inner.config.demo_value)
            .query_async::<()>(&mut conn)
            .await?;
        let message: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        tracing::info!(key = %key, message = ?message, "Message from Redis");

        let mut slot = self.inner.connection.write().await;
        if self.inner.is_closing() {
            return Err(ConnectorError::Unavailable("Redis client is closing".into()));
        }
        *slot = Some(conn);
        Ok(())
    }

    fn on_connected(&self) {
        if self.inner.is_closing() {
            return;
        }
        let closing = self.inner.closing.subscribe();
        self.inner
            .reporter
            .spawn_watched("cache-heartbeat", heartbeat(self.clone(), closing));
    }

    async fn close(&self) -> Result<(), ConnectorError> {
        self.inner.closing.send_replace(true);

        let conn = self.inner.connection.write().await.take();
        if let Some(mut conn) = conn {
            redis::cmd("QUIT").query_async::<()>(&mut conn).await?;
            tracing::info!("Redis connection closed");
        }
        Ok(())
    }
}

/// Mask the password of a Redis URL for logging.
fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        Ok(url) => url.to_string(),
        Err(_) => "<invalid url>".to_string(),
    }
}
