//! Europa CLI
//!
//! Command-line interface for managing promotion pipelines on a Europa console.

mod commands;
mod config;
mod id_resolver;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "europa")]
#[command(about = "Europa container pipeline CLI", long_about = None)]
struct Cli {
    /// Console URL
    #[arg(
        long,
        env = "EUROPA_CONSOLE_URL",
        default_value = "http://localhost:8080"
    )]
    console_url: String,

    /// Seconds between refreshes in `pipeline watch`
    #[arg(long, env = "EUROPA_POLL_INTERVAL", default_value_t = 25)]
    poll_interval: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "europa=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::new(cli.console_url).with_poll_interval_secs(cli.poll_interval);
    config.validate()?;

    handle_command(cli.command, &config).await
}
