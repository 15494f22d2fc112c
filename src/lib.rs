//! Koronet web service library.

pub mod config;
pub mod connectors;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::ServiceConfig;
pub use health::HealthState;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
