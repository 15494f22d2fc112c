//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the shared health state and both connectors
//! - Bind the listener and begin accepting traffic
//! - Bootstrap dependencies in the background
//! - Hand the running pieces to the shutdown routine
//!
//! # Design Decisions
//! - Listener starts first: traffic is served before dependencies are ready
//! - Dependency failure at startup is a status flag, not a startup error
//! - Only configuration and bind problems abort startup

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::{AbortHandle, JoinHandle};

use crate::config::ServiceConfig;
use crate::connectors::{
    connect_with_retry, startup_policy, CacheConnector, Connector, ConnectorError,
    DatabaseConnector,
};
use crate::health::{HealthState, Subsystem};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::{graceful_shutdown, Shutdown, ShutdownOutcome, ShutdownReason};
use crate::lifecycle::signals::{fatal_channel, next_shutdown_reason, FatalEvents, FatalReporter};
use crate::observability::metrics;

/// Problems that stop the service from starting at all.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("invalid cache configuration: {0}")]
    Cache(#[from] ConnectorError),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// A started service: serving HTTP, dependencies bootstrapping.
pub struct Service {
    local_addr: SocketAddr,
    health: HealthState,
    shutdown: Shutdown,
    server: JoinHandle<Result<(), std::io::Error>>,
    connectors: Vec<Arc<dyn Connector>>,
    bootstraps: Vec<AbortHandle>,
    fatal: FatalEvents,
    drain_timeout: Duration,
}

impl Service {
    /// Bind, serve, and kick off both connectors without waiting for them.
    pub async fn start(config: &ServiceConfig) -> Result<Self, StartupError> {
        let health = HealthState::new();
        metrics::spawn_health_recorder(&health);
        let (reporter, fatal) = fatal_channel();

        let database: Arc<dyn Connector> = Arc::new(DatabaseConnector::new(
            &config.database,
            health.clone(),
            reporter.clone(),
        ));
        let cache: Arc<dyn Connector> = Arc::new(CacheConnector::new(
            &config.cache,
            health.clone(),
            reporter.clone(),
        )?);
        let connectors = vec![database, cache];

        let address = config.listener.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| StartupError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

        tracing::info!(
            address = %local_addr,
            environment = %config.environment,
            "Web server listening"
        );

        let shutdown = Shutdown::new();
        let server = spawn_server(
            HttpServer::new(config, health.clone()),
            listener,
            &shutdown,
            reporter.clone(),
        );

        let policy = startup_policy(&config.startup);
        let bootstraps = connectors
            .iter()
            .map(|connector| {
                let connector = Arc::clone(connector);
                let health = health.clone();
                let name = match connector.subsystem() {
                    Subsystem::Database => "database-bootstrap",
                    _ => "cache-bootstrap",
                };
                reporter.spawn_watched(name, async move {
                    connect_with_retry(connector.as_ref(), &health, &policy).await;
                })
            })
            .collect();

        Ok(Self {
            local_addr,
            health,
            shutdown,
            server,
            connectors,
            bootstraps,
            fatal,
            drain_timeout: config.shutdown.drain_timeout(),
        })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared health state.
    pub fn health(&self) -> &HealthState {
        &self.health
    }

    /// Wait for a signal or a fatal task event.
    pub async fn wait_for_shutdown(&mut self) -> ShutdownReason {
        next_shutdown_reason(&mut self.fatal).await
    }

    /// Stop pending bootstraps, drain the server and close both connectors.
    pub async fn shutdown(self, reason: ShutdownReason) -> ShutdownOutcome {
        for bootstrap in &self.bootstraps {
            bootstrap.abort();
        }
        graceful_shutdown(
            reason,
            &self.shutdown,
            self.server,
            &self.connectors,
            self.drain_timeout,
        )
        .await
    }
}

fn spawn_server(
    server: HttpServer,
    listener: TcpListener,
    shutdown: &Shutdown,
    reporter: FatalReporter,
) -> JoinHandle<Result<(), std::io::Error>> {
    let signal = shutdown.subscribe();
    let task = tokio::spawn(server.run(listener, signal));
    tokio::spawn(async move {
        match task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "HTTP server failed");
                reporter.report(ShutdownReason::TaskFailure);
                Err(e)
            }
            Err(join_err) => {
                tracing::error!(error = %join_err, "HTTP server task ended abnormally");
                reporter.report(if join_err.is_panic() {
                    ShutdownReason::Panic
                } else {
                    ShutdownReason::TaskFailure
                });
                Err(std::io::Error::other(join_err.to_string()))
            }
        }
    })
}

/// Run the service until a shutdown source fires; returns the process exit code.
pub async fn run(config: ServiceConfig) -> ExitCode {
    if config.observability.metrics_enabled {
        let result = config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))
            .and_then(|addr| metrics::init_metrics(addr).map_err(StartupError::from));
        if let Err(e) = result {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    }

    let mut service = match Service::start(&config).await {
        Ok(service) => service,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    let reason = service.wait_for_shutdown().await;
    service.shutdown(reason).await.exit_code()
}
