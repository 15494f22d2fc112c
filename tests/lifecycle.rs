//! Lifecycle tests: real listeners, real shutdown.

use koronet_web::health::{HealthState, Subsystem};
use koronet_web::lifecycle::{Service, Shutdown, ShutdownOutcome, ShutdownReason};
use std::time::Duration;

mod common;

#[tokio::test]
async fn test_service_answers_while_dependencies_are_unreachable() {
    let config = common::test_config();
    let service = Service::start(&config).await.unwrap();
    let base = format!("http://{}", service.local_addr());
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/", base)).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let res = client.get(format!("{}/health", base)).send().await.unwrap();
    assert_eq!(res.status(), 503);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["services"]["server"], "up");
    assert_eq!(body["services"]["database"], "down");

    let res = client.get(format!("{}/ready", base)).send().await.unwrap();
    assert_eq!(res.status(), 503);

    let outcome = service.shutdown(ShutdownReason::Terminate).await;
    assert_eq!(outcome, ShutdownOutcome::Clean);
    assert_eq!(outcome.code(), 0);
}

#[tokio::test]
async fn test_bootstrap_gives_up_and_leaves_dependencies_down() {
    let config = common::test_config();
    let service = Service::start(&config).await.unwrap();

    // Two attempts, 10ms apart, each bounded by a 200ms timeout.
    tokio::time::sleep(Duration::from_millis(800)).await;
    let status = service.health().snapshot();
    assert!(status.server);
    assert!(!status.database);
    assert!(!status.cache);

    let outcome = service.shutdown(ShutdownReason::Interrupt).await;
    assert_eq!(outcome, ShutdownOutcome::Clean);
}

#[tokio::test]
async fn test_status_changes_are_visible_to_running_server() {
    let config = common::test_config();
    let shutdown = Shutdown::new();
    let health = HealthState::new();
    let (addr, handle) = common::start_server(&config, health.clone(), &shutdown).await;
    let url = format!("http://{}/ready", addr);

    assert_eq!(reqwest::get(&url).await.unwrap().status(), 503);

    health.set_status(Subsystem::Database, true);
    health.set_status(Subsystem::Cache, true);
    assert_eq!(reqwest::get(&url).await.unwrap().status(), 200);

    shutdown.trigger();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_server_stops_accepting_after_shutdown() {
    let config = common::test_config();
    let shutdown = Shutdown::new();
    let (addr, handle) = common::start_server(&config, common::all_up(), &shutdown).await;
    let url = format!("http://{}/health", addr);

    assert_eq!(reqwest::get(&url).await.unwrap().status(), 200);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("server drained in time")
        .unwrap()
        .unwrap();

    assert!(reqwest::get(&url).await.is_err());
}

#[tokio::test]
async fn test_bind_conflict_fails_startup() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = common::test_config();
    config.listener.port = taken.local_addr().unwrap().port();

    assert!(Service::start(&config).await.is_err());
}

#[tokio::test]
async fn test_shutdown_during_bootstrap_retries_is_prompt() {
    let mut config = common::test_config();
    config.startup.max_retries = 5;
    config.startup.retry_delay_ms = 60_000;
    let service = Service::start(&config).await.unwrap();
    let health = service.health().clone();

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        service.shutdown(ShutdownReason::Terminate),
    )
    .await
    .expect("shutdown should not wait for bootstrap retries");

    assert_eq!(outcome, ShutdownOutcome::Clean);
    tokio::time::sleep(Duration::from_millis(300)).await;
    let status = health.snapshot();
    assert!(!status.database);
    assert!(!status.cache);
}
