//! Job command handlers
//!
//! Handles submitting, cancelling, listing and following jobs through the
//! selected driver.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use batchbridge_client::{DriverRegistry, RemoteExecutor};
use batchbridge_core::{Job, JobSpec, JobState};
use clap::Args;
use colored::*;

use crate::config::Config;
use crate::poller::StatusPoller;

/// Arguments of `bbridge submit`
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Executable to run on the compute nodes
    #[arg(required_unless_present = "spec")]
    executable: Option<String>,

    /// Arguments passed to the executable
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,

    /// Read the job specification from a JSON file
    #[arg(long, conflicts_with = "executable")]
    spec: Option<PathBuf>,

    /// Job name
    #[arg(long)]
    name: Option<String>,

    /// Working directory on the remote system
    #[arg(long)]
    directory: Option<PathBuf>,

    /// Environment variable as KEY=VALUE (repeatable)
    #[arg(long = "env", value_parser = parse_env)]
    env: Vec<(String, String)>,

    /// Number of nodes
    #[arg(long)]
    nodes: Option<u32>,

    /// Wall-time limit in minutes
    #[arg(long)]
    minutes: Option<u64>,

    /// Follow the job until it finishes
    #[arg(long)]
    wait: bool,

    /// Seconds between status refreshes when waiting
    #[arg(long, default_value_t = 5)]
    interval: u64,
}

impl SubmitArgs {
    /// Builds the job specification, with flags overriding the spec file
    fn to_spec(&self) -> Result<JobSpec> {
        let mut spec = match (&self.spec, &self.executable) {
            (Some(path), _) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str::<JobSpec>(&raw)
                    .with_context(|| format!("Failed to parse job specification {}", path.display()))?
            }
            (None, Some(executable)) => JobSpec::new(executable.clone()),
            (None, None) => bail!("Either an executable or --spec is required"),
        };

        spec.arguments.extend(self.args.iter().cloned());
        if let Some(name) = &self.name {
            spec = spec.with_name(name.clone());
        }
        if let Some(directory) = &self.directory {
            spec = spec.with_directory(directory.clone());
        }
        for (key, value) in &self.env {
            spec = spec.with_env(key.clone(), value.clone());
        }
        if let Some(nodes) = self.nodes {
            spec = spec.with_node_count(nodes);
        }
        if let Some(minutes) = self.minutes {
            spec = spec.with_duration(Duration::from_secs(minutes * 60));
        }

        Ok(spec)
    }
}

fn parse_env(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

/// Submit a job, optionally following it to completion
pub async fn submit(config: &Config, args: SubmitArgs) -> Result<()> {
    let executor = config.executor(&DriverRegistry::builtin())?;
    let mut job = Job::new(args.to_spec()?);

    executor
        .submit(&mut job)
        .await
        .context("Failed to submit job")?;

    println!(
        "{} Submitted job {} via {}",
        "✓".green(),
        job.native_id().unwrap_or("?").bold(),
        config.driver.cyan()
    );

    if args.wait {
        follow(executor, &mut job, args.interval).await?;
    }

    Ok(())
}

/// Request cancellation of a job
pub async fn cancel(config: &Config, id: &str) -> Result<()> {
    let executor = config.executor(&DriverRegistry::builtin())?;
    let job = attached(&executor, id).await?;

    executor
        .cancel(&job)
        .await
        .with_context(|| format!("Failed to cancel job {}", id))?;

    println!("{} Cancellation requested for job {}", "✓".green(), id.bold());
    Ok(())
}

/// List all jobs visible to the configured credential
pub async fn list(config: &Config) -> Result<()> {
    let executor = config.executor(&DriverRegistry::builtin())?;
    let ids = executor.list().await.context("Failed to list jobs")?;

    if ids.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", ids.len()).bold());
        for id in ids {
            println!("  {} {}", "▸".cyan(), id);
        }
    }

    Ok(())
}

/// Show the current state of a job
pub async fn status(config: &Config, id: &str) -> Result<()> {
    let executor = config.executor(&DriverRegistry::builtin())?;
    let job = attached(&executor, id).await?;

    println!("{}", "Job Details:".bold());
    println!("  Native ID: {}", id.cyan());
    println!("  Driver:    {}", config.driver);
    println!("  State:     {}", colorize_state(job.state()));

    Ok(())
}

/// Attach to a job and follow it until it finishes
pub async fn watch(config: &Config, id: &str, interval: u64) -> Result<()> {
    let executor = config.executor(&DriverRegistry::builtin())?;
    let mut job = attached(&executor, id).await?;

    println!("Job {} is {}", id.bold(), colorize_state(job.state()));
    follow(executor, &mut job, interval).await
}

/// Creates a job handle bound to an existing native job
///
/// Jobs known only by id carry an empty specification.
async fn attached(executor: &RemoteExecutor, id: &str) -> Result<Job> {
    let mut job = Job::new(JobSpec::new(""));

    executor
        .attach(&mut job, id)
        .await
        .with_context(|| format!("Failed to attach to job {}", id))?;

    Ok(job)
}

async fn follow(
    executor: RemoteExecutor,
    job: &mut Job,
    interval: u64,
) -> Result<()> {
    let poller = StatusPoller::new(executor, Duration::from_secs(interval.max(1)));

    let finished = tokio::select! {
        result = poller.run(job, |job, from, to| {
            println!(
                "  {} {} {} → {}",
                "▸".cyan(),
                job.native_id().unwrap_or("?"),
                colorize_state(from),
                colorize_state(to)
            );
        }) => result?,
        _ = tokio::signal::ctrl_c() => {
            println!("{}", "Stopped following; the job keeps running.".yellow());
            return Ok(());
        }
    };

    println!("Job finished: {}", colorize_state(finished));
    if finished != JobState::Completed {
        bail!("Job ended in state {}", finished);
    }
    Ok(())
}

/// Colorize job state for display
fn colorize_state(state: JobState) -> ColoredString {
    let state_str = state.to_string();
    match state {
        JobState::New => state_str.dimmed(),
        JobState::Queued => state_str.yellow(),
        JobState::Active => state_str.cyan(),
        JobState::Completed => state_str.green(),
        JobState::Canceled => state_str.dimmed(),
        JobState::Failed => state_str.red(),
    }
}
