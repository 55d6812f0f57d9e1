//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod drivers;
mod job;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List available drivers
    Drivers {
        /// Also print each driver's native state mapping
        #[arg(long)]
        states: bool,
    },
    /// Submit a job
    Submit(job::SubmitArgs),
    /// Request cancellation of a job
    Cancel {
        /// Native job id
        id: String,
    },
    /// List the native ids of all visible jobs
    List,
    /// Show the current state of a job
    Status {
        /// Native job id
        id: String,
    },
    /// Attach to an existing job and follow it until it finishes
    Watch {
        /// Native job id
        id: String,

        /// Seconds between status refreshes
        #[arg(long, default_value_t = 5)]
        interval: u64,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Drivers { states } => drivers::list_drivers(states),
        Commands::Submit(args) => job::submit(config, args).await,
        Commands::Cancel { id } => job::cancel(config, &id).await,
        Commands::List => job::list(config).await,
        Commands::Status { id } => job::status(config, &id).await,
        Commands::Watch { id, interval } => job::watch(config, &id, interval).await,
    }
}
