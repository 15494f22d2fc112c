//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use koronet_web::config::ServiceConfig;
use koronet_web::health::{HealthState, Subsystem};
use koronet_web::http::HttpServer;
use koronet_web::lifecycle::Shutdown;
use serde_json::Value;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;

/// Configuration pointing at dependencies nobody listens on, with fast retries.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.environment = "test".into();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;

    config.database.host = "127.0.0.1".into();
    config.database.port = 1;
    config.database.connection_timeout_ms = 200;

    config.cache.url = Some("redis://127.0.0.1:1".into());
    config.cache.connect_timeout_ms = 200;

    config.startup.max_retries = 2;
    config.startup.retry_delay_ms = 10;
    config.shutdown.drain_timeout_secs = 2;
    config
}

/// Health state with every subsystem up.
pub fn all_up() -> HealthState {
    let health = HealthState::new();
    health.set_status(Subsystem::Database, true);
    health.set_status(Subsystem::Cache, true);
    health
}

/// Router of a server built from `config` and `health`.
pub fn router(config: &ServiceConfig, health: HealthState) -> Router {
    HttpServer::new(config, health).router()
}

/// Send a request through `router` in-process.
pub async fn send(router: Router, method: &str, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    router.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Run a real server on an ephemeral port until `shutdown` fires.
pub async fn start_server(
    config: &ServiceConfig,
    health: HealthState,
    shutdown: &Shutdown,
) -> (SocketAddr, JoinHandle<std::io::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, health);
    let signal = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, signal).await });
    (addr, handle)
}
