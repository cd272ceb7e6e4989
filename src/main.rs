//! Folio: nested folders of learning materials.
//!
//! Entry point: loads configuration, initialises logging, and dispatches the
//! parsed command.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use folio_cli::Cli;
use folio_core::config::AppConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::debug!(config_dir = %cli.config, env = %cli.env, "Configuration loaded");

    if let Err(e) = cli.execute(&config).await {
        tracing::debug!(kind = %e.kind, retryable = e.kind.is_retryable(), "Command failed");
        eprintln!("Error: {e}");
        std::process::exit(if e.kind.is_retryable() { 75 } else { 1 });
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
