//! Shutdown coordination for the service.

use std::fmt;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::connectors::Connector;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Why the service is shutting down. Used as a log label only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
    /// A supervised background task panicked.
    Panic,
    /// A supervised background task returned an error.
    TaskFailure,
}

impl ShutdownReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::Interrupt => "SIGINT",
            ShutdownReason::Terminate => "SIGTERM",
            ShutdownReason::Panic => "PANIC",
            ShutdownReason::TaskFailure => "TASK_FAILURE",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the shutdown routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    Clean,
    Failed,
}

impl ShutdownOutcome {
    /// 0 when clean, 1 when any step failed.
    pub fn code(&self) -> u8 {
        match self {
            ShutdownOutcome::Clean => 0,
            ShutdownOutcome::Failed => 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

/// Stop accepting connections, drain the server, then close every connector.
///
/// Each step runs even when an earlier one failed; failures are logged and
/// turn the outcome into [`ShutdownOutcome::Failed`].
pub async fn graceful_shutdown(
    reason: ShutdownReason,
    shutdown: &Shutdown,
    server: JoinHandle<Result<(), std::io::Error>>,
    connectors: &[Arc<dyn Connector>],
    drain_timeout: Duration,
) -> ShutdownOutcome {
    tracing::info!(signal = %reason, "Starting graceful shutdown");
    let mut outcome = ShutdownOutcome::Clean;

    shutdown.trigger();
    match tokio::time::timeout(drain_timeout, server).await {
        Ok(Ok(Ok(()))) => tracing::info!("HTTP server closed"),
        Ok(Ok(Err(e))) => {
            tracing::error!(error = %e, "HTTP server failed while draining");
            outcome = ShutdownOutcome::Failed;
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "HTTP server task aborted");
            outcome = ShutdownOutcome::Failed;
        }
        Err(_) => {
            // Dropping the timed-out future detaches the task; the runtime
            // stops it when the process exits.
            tracing::warn!(
                timeout_secs = drain_timeout.as_secs(),
                "Drain deadline reached with requests still in flight"
            );
        }
    }

    for connector in connectors {
        let subsystem = connector.subsystem();
        if let Err(e) = connector.close().await {
            tracing::error!(subsystem = %subsystem, error = %e, "Error during shutdown");
            outcome = ShutdownOutcome::Failed;
        }
    }

    match outcome {
        ShutdownOutcome::Clean => tracing::info!("Graceful shutdown completed"),
        ShutdownOutcome::Failed => tracing::error!("Graceful shutdown finished with errors"),
    }
    outcome
}
