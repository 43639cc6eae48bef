//! `urbanflow-runner` -- submit urban-planning jobs and track them.
//!
//! Submits one batch of work requests to the job queue, renders progress
//! while the jobs run, and exits `0` only if every request was submitted
//! and every job succeeded.
//!
//! # Environment variables
//!
//! | Variable                 | Required | Default                 | Description                    |
//! |--------------------------|----------|-------------------------|--------------------------------|
//! | `JOB_QUEUE_URL`          | no       | `http://localhost:8000` | Job queue base URL             |
//! | `POLL_INTERVAL_MS`       | no       | `1500`                  | Milliseconds between polls     |
//! | `REQUEST_TIMEOUT_SECS`   | no       | `30`                    | Per-request HTTP timeout       |
//! | `EVENT_CHANNEL_CAPACITY` | no       | `256`                   | Tracker event buffer           |
//! | `LOG_FORMAT`             | no       | `text`                  | `text` or `json`               |

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use urbanflow_queue::{JobQueueApi, QueueConfig};
use urbanflow_runner::cli::{Cli, Command, LogFormat};
use urbanflow_runner::{logging, run};
use urbanflow_tracker::{ProgressTracker, TrackerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.log_format.unwrap_or_else(LogFormat::from_env));

    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Runner failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut queue_config = QueueConfig::from_env().context("invalid job queue configuration")?;
    let mut tracker_config = TrackerConfig::from_env().context("invalid tracker configuration")?;
    cli.apply_overrides(&mut queue_config, &mut tracker_config);
    queue_config.validate()?;
    tracker_config.validate()?;

    let api = Arc::new(JobQueueApi::new(&queue_config)?);
    let mut stdout = std::io::stdout();

    let Some(requests) = cli.command.requests() else {
        if let Command::Status { job } = cli.command {
            run::run_status(api.as_ref(), job, &mut stdout).await?;
        }
        return Ok(ExitCode::SUCCESS);
    };

    tracing::info!(
        api_url = %queue_config.api_url,
        poll_interval_ms = tracker_config.poll_interval.as_millis() as u64,
        requests = requests.len(),
        "Starting urbanflow-runner",
    );

    let tracker = ProgressTracker::new(api, tracker_config);
    let summary = run::run_batch(&tracker, requests, &mut stdout).await;
    tracker.shutdown();

    Ok(ExitCode::from(summary?.exit_code()))
}
