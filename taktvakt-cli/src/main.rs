//! ## taktvakt-cli
//! **`taktvakt` binary: configure, run and stop the pipeline**
//!
//! SIGINT/SIGTERM set the quiescence flag; the pipeline drains its services
//! and prints per-service statistics before exiting.

use clap::Parser;
use taktvakt_telemetry::EventLogger;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    EventLogger::init();
    let cli = Cli::parse();
    commands::run_command(cli).await
}
