//! Concurrent batch submission.
//!
//! Every request is submitted at once; there is no ordering dependency
//! between them and no retry. A request that fails to produce a job id
//! is reported as a [`SubmissionFailure`] and never tracked.

use std::collections::BTreeSet;

use futures::future::join_all;
use serde::Serialize;
use urbanflow_core::{JobId, WorkRequest};
use urbanflow_queue::JobService;

/// A work request that could not be submitted.
///
/// Distinct from a job that was submitted and later reported `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionFailure {
    /// Position of the request in the submitted batch.
    pub index: usize,
    pub job_type: &'static str,
    pub label: String,
    pub reason: String,
}

/// Result of submitting a batch of requests.
#[derive(Debug, Clone, Default)]
pub struct SubmissionOutcome {
    /// Ids the service assigned, deduplicated, in submission order.
    pub job_ids: Vec<JobId>,
    pub failures: Vec<SubmissionFailure>,
}

/// Submit every request concurrently and collect ids and failures.
pub async fn submit_all<S>(service: &S, requests: &[WorkRequest]) -> SubmissionOutcome
where
    S: JobService + ?Sized,
{
    let results = join_all(requests.iter().map(|request| service.submit_job(request))).await;

    let mut outcome = SubmissionOutcome::default();
    let mut seen = BTreeSet::new();

    for (index, (request, result)) in requests.iter().zip(results).enumerate() {
        match result {
            Ok(job_id) => {
                tracing::debug!(job_id, job_type = request.job_type(), "Job submitted");
                if seen.insert(job_id) {
                    outcome.job_ids.push(job_id);
                } else {
                    tracing::warn!(job_id, "Job queue returned a duplicate job id");
                }
            }
            Err(e) => {
                tracing::warn!(
                    index,
                    job_type = request.job_type(),
                    error = %e,
                    "Job submission failed",
                );
                outcome.failures.push(SubmissionFailure {
                    index,
                    job_type: request.job_type(),
                    label: request.label(),
                    reason: e.to_string(),
                });
            }
        }
    }

    outcome
}
