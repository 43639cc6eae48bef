//! Batch lifecycle events published by the tracker.
//!
//! UI consumers subscribe via
//! [`ProgressTracker::subscribe`](crate::ProgressTracker::subscribe) to
//! render progress and to refresh results once a batch completes.

use chrono::Utc;
use serde::Serialize;
use urbanflow_core::{Health, JobId, JobStatus, Timestamp};

use crate::state::ProgressSnapshot;

/// A tracker event, tagged with the batch generation it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerEvent {
    pub generation: u64,
    pub kind: TrackerEventKind,
    /// When the event was created (UTC).
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackerEventKind {
    /// A batch was armed with `total` tracked jobs.
    BatchStarted { total: usize, failed_submissions: usize },

    /// A work request could not be submitted and will not be tracked.
    SubmissionFailed { label: String, reason: String },

    /// A job reached a terminal status.
    JobSettled { job_id: JobId, status: JobStatus },

    /// Progress after a fully applied tick.
    Progress(ProgressSnapshot),

    /// Every job in the batch settled.
    BatchCompleted { health: Health },

    /// A newer batch replaced this one before it settled.
    BatchSuperseded,
}

impl TrackerEvent {
    pub fn new(generation: u64, kind: TrackerEventKind) -> Self {
        Self {
            generation,
            kind,
            timestamp: Utc::now(),
        }
    }
}
