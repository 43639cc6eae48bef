//! Remote job status and aggregate batch health.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Status of a single remote job as reported by the job queue.
///
/// The tracker never invents a status; every value it holds came from
/// the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Whether the job has settled (`Succeeded` or `Failed`).
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    /// Map a status string from the job queue onto a [`JobStatus`].
    ///
    /// The queue server writes `pending` on creation, workers report
    /// `success` or `failed`, and older rows use `fail`. A job that a
    /// worker has claimed may read `running`, which is still pending from
    /// the tracker's point of view. Anything else is rejected so it can
    /// be treated as an unknown status for the current tick.
    pub fn from_wire(raw: &str) -> Result<Self, CoreError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "running" | "queued" => Ok(JobStatus::Pending),
            "success" | "succeeded" => Ok(JobStatus::Succeeded),
            "failed" | "fail" => Ok(JobStatus::Failed),
            _ => Err(CoreError::UnknownVariant {
                kind: "job status",
                value: raw.to_string(),
            }),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate outcome signal for a batch: `Ok` unless any job failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    #[default]
    Ok,
    Degraded,
}

impl Health {
    /// Fold a settled job status into the health flag.
    ///
    /// `Degraded` is sticky: once any job has failed, nothing upgrades
    /// the batch back to `Ok`.
    pub fn absorb(self, status: JobStatus) -> Self {
        match (self, status) {
            (Health::Degraded, _) | (_, JobStatus::Failed) => Health::Degraded,
            _ => Health::Ok,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Health::Ok
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Health::Ok => "ok",
            Health::Degraded => "degraded",
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
