//! Library entrypoint for the docx edit service, so other binaries can reuse
//! the server without shelling out.

pub mod auth;
pub mod cli;
pub mod concurrency;
pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod server;
pub mod upload;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::ServiceConfig;

fn try_init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Run the service using CLI args (parsed by the caller).
pub async fn run_with_cli(cli: cli::Cli) -> Result<()> {
    try_init_tracing(&cli.log_level);
    let config = ServiceConfig::from_cli(&cli);
    server::serve(config).await
}
