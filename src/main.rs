//! Koronet web service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request      ┌──────────────────────────────────────────────┐
//!     ────────────────────┼─▶ http (/, /health, /ready) ◀── HealthState  │
//!                         │                                   ▲          │
//!                         │                    ┌──────────────┴───────┐  │
//!                         │                    │      connectors      │  │
//!                         │                    │  database │  cache   │──┼──▶ Postgres / Redis
//!                         │                    └──────────────────────┘  │
//!                         │  lifecycle: startup → signals → shutdown     │
//!                         └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use koronet_web::config::load_config;
use koronet_web::lifecycle;
use koronet_web::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "koronet-web")]
#[command(about = "Koronet web service", long_about = None)]
struct Cli {
    /// Optional TOML configuration file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("koronet-web: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.observability) {
        eprintln!("koronet-web: failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        bind_address = %config.listener.bind_address(),
        database = ?config.database,
        cache_host = %config.cache.host,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    lifecycle::run(config).await
}
