//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define service metrics (requests, latency, dependency status)
//! - Expose Prometheus-compatible metrics endpoint
//! - Follow health transitions through the `HealthEvent` stream
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `service_dependency_up` (gauge): 1=up, 0=down, by subsystem
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op
//! - The exporter only starts when enabled in config

use axum::{body::Body, http::Request, middleware::Next, response::IntoResponse};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::health::{HealthState, Subsystem};

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    counter!("http_requests_total", "method" => method.clone(), "status" => status.clone())
        .increment(1);
    histogram!("http_request_duration_seconds", "method" => method, "status" => status)
        .record(start.elapsed().as_secs_f64());
}

/// Record a subsystem's current status.
pub fn record_dependency_status(subsystem: Subsystem, up: bool) {
    gauge!("service_dependency_up", "subsystem" => subsystem.as_str())
        .set(if up { 1.0 } else { 0.0 });
}

/// Request metrics middleware.
pub async fn track_requests(req: Request<Body>, next: Next) -> impl IntoResponse {
    let start = Instant::now();
    let method = req.method().to_string();

    let response = next.run(req).await;
    record_request(&method, response.status().as_u16(), start);
    response
}

/// Observe `health` for the life of the process: log every transition and
/// mirror it into `service_dependency_up`.
pub fn spawn_health_recorder(health: &HealthState) -> tokio::task::JoinHandle<()> {
    let initial = health.snapshot();
    for subsystem in Subsystem::ALL {
        record_dependency_status(subsystem, initial.get(subsystem));
    }

    let events = health.subscribe();
    tokio::spawn(follow_health(events))
}

async fn follow_health(mut events: broadcast::Receiver<crate::health::HealthEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                tracing::info!(
                    subsystem = %event.subsystem,
                    status = if event.up { "up" } else { "down" },
                    "Subsystem status changed"
                );
                record_dependency_status(event.subsystem, event.up);
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Health recorder lagged behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
