//! Drives one batch through the tracker and streams progress to a writer.

use std::io::Write;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use urbanflow_core::{JobId, JobStatus, WorkRequest};
use urbanflow_queue::JobService;
use urbanflow_tracker::{ProgressTracker, TrackerEvent};

use crate::report::{self, RunSummary};

/// Submit `requests` as one batch and wait for it to settle, writing a
/// line per job settlement and per progress update.
pub async fn run_batch<W: Write>(
    tracker: &ProgressTracker,
    requests: Vec<WorkRequest>,
    out: &mut W,
) -> anyhow::Result<RunSummary> {
    let mut events = tracker.subscribe();

    let receipt = tracker.submit_batch(requests).await?;
    let generation = receipt.generation;
    for failure in &receipt.failures {
        writeln!(out, "{}", report::failure_line(failure))?;
    }

    let completion = receipt.completion.wait();
    tokio::pin!(completion);

    let health = loop {
        tokio::select! {
            result = &mut completion => break result?,
            event = events.recv() => match event {
                Ok(event) => write_event(out, generation, &event)?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Progress output fell behind; events dropped");
                }
                Err(RecvError::Closed) => break (&mut completion).await?,
            },
        }
    };

    // Completion resolves before the last events are read.
    loop {
        match events.try_recv() {
            Ok(event) => write_event(out, generation, &event)?,
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }

    let summary = RunSummary {
        generation,
        job_ids: receipt.job_ids,
        failures: receipt.failures,
        health,
    };
    for line in summary.lines() {
        writeln!(out, "{line}")?;
    }
    Ok(summary)
}

/// Query one job's status and print it.
pub async fn run_status<S, W>(service: &S, job_id: JobId, out: &mut W) -> anyhow::Result<JobStatus>
where
    S: JobService + ?Sized,
    W: Write,
{
    let status = service.job_status(job_id).await?;
    writeln!(out, "job {job_id}: {status}")?;
    Ok(status)
}

fn write_event<W: Write>(out: &mut W, generation: u64, event: &TrackerEvent) -> std::io::Result<()> {
    if event.generation != generation {
        return Ok(());
    }
    match report::event_line(event) {
        Some(line) => writeln!(out, "{line}"),
        None => Ok(()),
    }
}
