//! Endpoint handlers.
//!
//! Every handler reads the health flags synchronously; there is no other
//! state behind these routes.

use axum::{extract::State, http::StatusCode, http::Uri, Json};
use serde::Serialize;

use crate::health::HealthStatus;
use crate::http::response::{timestamp, ApiError};
use crate::http::server::AppState;

/// Fixed greeting returned by `GET /`.
pub const GREETING: &str = "Hi Koronet Team.";

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub timestamp: String,
    pub environment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Up,
    Down,
}

impl From<bool> for ServiceStatus {
    fn from(up: bool) -> Self {
        if up {
            ServiceStatus::Up
        } else {
            ServiceStatus::Down
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServicesReport {
    pub server: ServiceStatus,
    pub database: ServiceStatus,
    pub cache: ServiceStatus,
}

impl From<HealthStatus> for ServicesReport {
    fn from(status: HealthStatus) -> Self {
        Self {
            server: status.server.into(),
            database: status.database.into(),
            cache: status.cache.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    pub services: ServicesReport,
    /// Seconds since startup.
    pub uptime: f64,
}

#[derive(Debug, Serialize)]
pub struct ReadyReport {
    pub ready: bool,
    pub timestamp: String,
}

/// `GET /`
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: GREETING,
        timestamp: timestamp(),
        environment: state.environment.to_string(),
    })
}

/// `GET /health`: 200 only when server, database and cache are all up.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let status = state.health.snapshot();
    let healthy = status.is_healthy();

    let report = HealthReport {
        status: if healthy { "healthy" } else { "unhealthy" },
        timestamp: timestamp(),
        services: status.into(),
        uptime: state.health.uptime().as_secs_f64(),
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}

/// `GET /ready`: 200 when both dependencies are up.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyReport>) {
    let ready = state.health.snapshot().is_ready();
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        code,
        Json(ReadyReport {
            ready,
            timestamp: timestamp(),
        }),
    )
}

/// Catch-all for unknown paths and unsupported methods.
pub async fn not_found(uri: Uri) -> ApiError {
    tracing::debug!(path = %uri.path(), "No route matched");
    ApiError::NotFound {
        path: uri.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_services_report_has_three_keys() {
        let status = HealthStatus {
            server: true,
            database: false,
            cache: true,
        };
        let value = serde_json::to_value(ServicesReport::from(status)).unwrap();
        let map = value.as_object().unwrap();

        assert_eq!(map.len(), 3);
        assert_eq!(map["server"], "up");
        assert_eq!(map["database"], "down");
        assert_eq!(map["cache"], "up");
    }
}
