//! OS signal handling and fatal task supervision.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Watch supervised background tasks for panics and errors
//! - Funnel every source into one [`ShutdownReason`]
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A failing supervised task is as fatal as SIGTERM
//! - Request handler panics are not supervised; they become 500s

use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::lifecycle::shutdown::ShutdownReason;

/// Sending half of the fatal-event funnel.
#[derive(Clone)]
pub struct FatalReporter {
    tx: mpsc::UnboundedSender<ShutdownReason>,
}

/// Receiving half of the fatal-event funnel.
pub struct FatalEvents {
    rx: mpsc::UnboundedReceiver<ShutdownReason>,
}

/// Create a connected reporter/receiver pair.
pub fn fatal_channel() -> (FatalReporter, FatalEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FatalReporter { tx }, FatalEvents { rx })
}

impl FatalReporter {
    /// Request shutdown for `reason`.
    pub fn report(&self, reason: ShutdownReason) {
        // The receiver only goes away once shutdown is already under way.
        let _ = self.tx.send(reason);
    }

    /// Spawn `fut` and report its panic or error as fatal.
    ///
    /// Aborting the returned handle cancels the task without reporting.
    pub fn spawn_supervised<F, E>(&self, name: &'static str, fut: F) -> AbortHandle
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let task = tokio::spawn(fut);
        let abort = task.abort_handle();
        let reporter = self.clone();

        tokio::spawn(async move {
            match task.await {
                Ok(Ok(())) => tracing::debug!(task = name, "Supervised task finished"),
                Ok(Err(e)) => {
                    tracing::error!(task = name, error = %e, "Unhandled task failure");
                    reporter.report(ShutdownReason::TaskFailure);
                }
                Err(join_err) if join_err.is_panic() => {
                    tracing::error!(task = name, error = %join_err, "Uncaught panic in task");
                    reporter.report(ShutdownReason::Panic);
                }
                Err(join_err) => {
                    tracing::debug!(task = name, error = %join_err, "Supervised task cancelled");
                }
            }
        });
        abort
    }

    /// Spawn a background loop; only a panic is fatal.
    pub fn spawn_watched<F>(&self, name: &'static str, fut: F) -> AbortHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn_supervised(name, async move {
            fut.await;
            Ok::<(), Infallible>(())
        })
    }
}

impl FatalEvents {
    /// Next fatal event, or `None` once every reporter is gone.
    pub async fn recv(&mut self) -> Option<ShutdownReason> {
        self.rx.recv().await
    }
}

/// Wait for SIGTERM or SIGINT.
///
/// # Panics
/// Panics if signal handlers cannot be registered (OS resource exhaustion).
#[cfg(unix)]
pub async fn wait_for_signal() -> ShutdownReason {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register SIGTERM handler");
            panic!("Cannot register SIGTERM handler: {}", e);
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register SIGINT handler");
            panic!("Cannot register SIGINT handler: {}", e);
        }
    };

    tokio::select! {
        _ = sigterm.recv() => ShutdownReason::Terminate,
        _ = sigint.recv() => ShutdownReason::Interrupt,
    }
}

/// Wait for Ctrl+C (non-Unix).
///
/// # Panics
/// Panics if the Ctrl+C handler cannot be registered.
#[cfg(not(unix))]
pub async fn wait_for_signal() -> ShutdownReason {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to wait for Ctrl+C");
        panic!("Cannot wait for Ctrl+C: {}", e);
    }
    ShutdownReason::Interrupt
}

/// First of: an OS signal, or a fatal event from a supervised task.
pub async fn next_shutdown_reason(fatal: &mut FatalEvents) -> ShutdownReason {
    let reason = tokio::select! {
        reason = wait_for_signal() => reason,
        Some(reason) = fatal.recv() => reason,
    };
    tracing::info!(signal = %reason, "Shutdown requested");
    reason
}
