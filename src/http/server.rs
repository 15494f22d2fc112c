//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, metrics, timeout, panics)
//! - Bind server to listener
//! - Drain in-flight requests on shutdown

use axum::{
    middleware,
    routing::{get, MethodRouter},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{ServiceConfig, TimeoutConfig};
use crate::health::HealthState;
use crate::http::handlers::{self, not_found};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::response::panic_response;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub health: HealthState,
    pub environment: Arc<str>,
}

/// HTTP server exposing the root, health and readiness endpoints.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &ServiceConfig, health: HealthState) -> Self {
        let state = AppState {
            health,
            environment: Arc::from(config.environment.as_str()),
        };

        Self {
            router: build_router(state, &config.timeouts),
        }
    }

    /// A clone of the fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server no longer accepting connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn endpoint(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    // Wrong method on a known path is reported like an unknown path.
    route.fallback(not_found)
}

/// Routes plus middleware.
pub fn build_router(state: AppState, timeouts: &TimeoutConfig) -> Router {
    let routes = Router::new()
        .route("/", endpoint(get(handlers::root)))
        .route("/health", endpoint(get(handlers::health)))
        .route("/ready", endpoint(get(handlers::ready)))
        .fallback(not_found)
        .with_state(state);

    apply_layers(routes, timeouts)
}

/// Wrap `router` in the service's middleware stack.
#[allow(deprecated)]
pub fn apply_layers(router: Router, timeouts: &TimeoutConfig) -> Router {
    router
        .layer(TimeoutLayer::new(Duration::from_secs(timeouts.request_secs)))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(metrics::track_requests))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(set_request_id_layer())
}
