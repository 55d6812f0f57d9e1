//! Batchbridge CLI
//!
//! Command-line interface for submitting and tracking jobs on remote batch
//! schedulers through a Batchbridge driver.

mod commands;
mod config;
mod poller;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::{Config, ConnectionFlags};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bbridge")]
#[command(about = "Remote batch scheduler CLI", long_about = None)]
struct Cli {
    /// Driver to use (see `bbridge drivers`)
    #[arg(long, env = "BATCHBRIDGE_DRIVER", default_value = "slurm-rest")]
    driver: String,

    #[command(flatten)]
    connection: ConnectionFlags,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bbridge=info,batchbridge_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::from_env(cli.driver)?.with_flags(&cli.connection);

    handle_command(cli.command, &config).await
}
