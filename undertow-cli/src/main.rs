//! Undertow CLI - command-line interface
//!
//! Drives the source resolution engine end to end: metadata lookup,
//! provider fallback search, quality ranking.

mod commands;

use clap::Parser;
use undertow_core::tracing_setup::{self, CliLogLevel};

#[derive(Parser)]
#[command(name = "undertow")]
#[command(about = "Multi-provider anime episode source resolver")]
struct Cli {
    /// Console log verbosity; the full trace always lands in logs/
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn)]
    log_level: CliLogLevel,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_setup::init_tracing(cli.log_level.as_tracing_level(), None)
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    commands::handle_command(cli.command).await
}
