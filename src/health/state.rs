//! Subsystem health state.
//!
//! # States
//! - server: up from construction until the process exits
//! - database / cache: down until a connector reports a successful connect
//!
//! # Transitions
//! ```text
//! down → up:   connector bootstrap succeeded, or cache reconnect succeeded
//! up → down:   bootstrap exhausted its retries, or a watcher saw an error
//! ```
//!
//! # Design Decisions
//! - One atomic flag per subsystem; readers never block
//! - Writers publish under a lock, so the last event matches the stored flag
//! - Only real transitions are published to subscribers
//! - Handle is cheap to clone and is injected, never global

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Capacity of the transition broadcast channel.
const EVENT_CAPACITY: usize = 64;

/// A tracked subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subsystem {
    Server,
    Database,
    Cache,
}

impl Subsystem {
    /// All subsystems, in reporting order.
    pub const ALL: [Subsystem; 3] = [Subsystem::Server, Subsystem::Database, Subsystem::Cache];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subsystem::Server => "server",
            Subsystem::Database => "database",
            Subsystem::Cache => "cache",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status transition published to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthEvent {
    pub subsystem: Subsystem,
    pub up: bool,
}

/// Point-in-time copy of every subsystem flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthStatus {
    pub server: bool,
    pub database: bool,
    pub cache: bool,
}

impl HealthStatus {
    /// Flag for a single subsystem.
    pub fn get(&self, subsystem: Subsystem) -> bool {
        match subsystem {
            Subsystem::Server => self.server,
            Subsystem::Database => self.database,
            Subsystem::Cache => self.cache,
        }
    }

    /// Liveness: every subsystem is up.
    pub fn is_healthy(&self) -> bool {
        self.server && self.database && self.cache
    }

    /// Readiness: both dependencies are up.
    pub fn is_ready(&self) -> bool {
        self.database && self.cache
    }
}

#[derive(Debug)]
struct Inner {
    server: AtomicBool,
    database: AtomicBool,
    cache: AtomicBool,
    /// Serializes a flag swap with its event so events follow store order.
    publish: Mutex<()>,
    events: broadcast::Sender<HealthEvent>,
    started_at: Instant,
}

/// Shared handle to the health flags.
#[derive(Debug, Clone)]
pub struct HealthState {
    inner: Arc<Inner>,
}

impl HealthState {
    /// Server up, dependencies down.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                server: AtomicBool::new(true),
                database: AtomicBool::new(false),
                cache: AtomicBool::new(false),
                publish: Mutex::new(()),
                events,
                started_at: Instant::now(),
            }),
        }
    }

    fn flag(&self, subsystem: Subsystem) -> &AtomicBool {
        match subsystem {
            Subsystem::Server => &self.inner.server,
            Subsystem::Database => &self.inner.database,
            Subsystem::Cache => &self.inner.cache,
        }
    }

    /// Record a subsystem as up or down.
    ///
    /// Returns `true` when the stored value changed.
    pub fn set_status(&self, subsystem: Subsystem, up: bool) -> bool {
        let _publish = self
            .inner
            .publish
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let previous = self.flag(subsystem).swap(up, Ordering::SeqCst);
        if previous == up {
            return false;
        }

        tracing::debug!(subsystem = %subsystem, up, "Health status changed");
        // No subscribers is fine; nobody is observing yet.
        let _ = self.inner.events.send(HealthEvent { subsystem, up });
        true
    }

    /// Copy the current flags.
    pub fn snapshot(&self) -> HealthStatus {
        HealthStatus {
            server: self.inner.server.load(Ordering::SeqCst),
            database: self.inner.database.load(Ordering::SeqCst),
            cache: self.inner.cache.load(Ordering::SeqCst),
        }
    }

    /// Subscribe to future status transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<HealthEvent> {
        self.inner.events.subscribe()
    }

    /// Time since this state was created.
    pub fn uptime(&self) -> Duration {
        self.inner.started_at.elapsed()
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status() {
        let health = HealthState::new();
        let status = health.snapshot();

        assert!(status.server);
        assert!(!status.database);
        assert!(!status.cache);
        assert!(!status.is_healthy());
        assert!(!status.is_ready());
    }

    #[test]
    fn test_ready_and_healthy() {
        let health = HealthState::new();
        health.set_status(Subsystem::Database, true);
        assert!(!health.snapshot().is_ready());

        health.set_status(Subsystem::Cache, true);
        let status = health.snapshot();
        assert!(status.is_ready());
        assert!(status.is_healthy());

        health.set_status(Subsystem::Server, false);
        let status = health.snapshot();
        assert!(status.is_ready());
        assert!(!status.is_healthy());
    }

    #[test]
    fn test_set_status_reports_change() {
        let health = HealthState::new();
        assert!(health.set_status(Subsystem::Cache, true));
        assert!(!health.set_status(Subsystem::Cache, true));
        assert!(health.set_status(Subsystem::Cache, false));
    }

    #[tokio::test]
    async fn test_subscribers_see_only_transitions() {
        let health = HealthState::new();
        let mut events = health.subscribe();

        health.set_status(Subsystem::Database, false);
        health.set_status(Subsystem::Database, true);
        health.set_status(Subsystem::Database, true);
        health.set_status(Subsystem::Cache, true);

        assert_eq!(
            events.recv().await.unwrap(),
            HealthEvent { subsystem: Subsystem::Database, up: true }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            HealthEvent { subsystem: Subsystem::Cache, up: true }
        );
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_clones_share_state() {
        let health = HealthState::new();
        let other = health.clone();
        other.set_status(Subsystem::Database, true);
        assert!(health.snapshot().database);
    }

    #[tokio::test]
    async fn test_concurrent_writers() {
        let health = HealthState::new();
        let mut handles = Vec::new();
        for i in 0..16 {
            let h = health.clone();
            handles.push(tokio::spawn(async move {
                h.set_status(Subsystem::Cache, i % 2 == 0);
                h.set_status(Subsystem::Database, true);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(health.snapshot().database);
    }

    #[test]
    fn test_events_follow_store_order_under_contention() {
        let health = HealthState::new();
        let mut events = health.subscribe();

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let h = health.clone();
                std::thread::spawn(move || {
                    for n in 0..4 {
                        h.set_status(Subsystem::Cache, (i + n) % 2 == 0);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let mut last = false;
        while let Ok(event) = events.try_recv() {
            // Every event is a real transition, so values alternate.
            assert_ne!(event.up, last);
            last = event.up;
        }
        assert_eq!(last, health.snapshot().cache);
    }
}
