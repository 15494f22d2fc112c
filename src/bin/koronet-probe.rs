use clap::{Parser, Subcommand};
use serde_json::Value;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "koronet-probe")]
#[command(about = "Query a running Koronet web service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the greeting from `/`
    Status,
    /// Fetch per-dependency status from `/health`
    Health,
    /// Fetch readiness from `/ready`
    Ready,
}

impl Commands {
    fn path(&self) -> &'static str {
        match self {
            Commands::Status => "/",
            Commands::Health => "/health",
            Commands::Ready => "/ready",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let url = format!("{}{}", cli.url.trim_end_matches('/'), cli.command.path());

    match probe(&url).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: request to {} failed: {}", url, e);
            ExitCode::FAILURE
        }
    }
}

/// Print the response body; `Ok(true)` when the status was 2xx.
async fn probe(url: &str) -> Result<bool, reqwest::Error> {
    let res = reqwest::get(url).await?;
    let status = res.status();
    let text = res.text().await?;

    let body = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json).unwrap_or(text),
        Err(_) => text,
    };

    if status.is_success() {
        println!("{}", body);
    } else {
        eprintln!("Error: service returned status {}", status);
        eprintln!("Response: {}", body);
    }
    Ok(status.is_success())
}
