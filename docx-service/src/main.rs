//! HTTP service for reading and editing DOCX documents: authenticates
//! requests, bounds concurrent editor instances, and exposes `/v1/read` and
//! `/v1/apply` over whatever implements `docx_core::DocxEngine`.

use anyhow::Result;
use clap::Parser;

use docx_service::{cli::Cli, run_with_cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli).await
}
