//! calchost - the simple-calculator tool host
//!
//! Speaks line-delimited JSON-RPC on stdin/stdout and offers add, multiply and
//! greet. Logs go to stderr since stdout carries the protocol.

use eyre::{Context, Result};
use tokio::io::BufReader;
use tracing::info;

use toolrelay::host::ToolServer;

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("CALCHOST_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    info!("calchost starting");

    let server = ToolServer::calculator();
    server
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
        .context("Tool server failed")?;

    info!("calchost exiting");
    Ok(())
}
