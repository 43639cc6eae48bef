//! The remote execution service boundary.

use std::sync::Arc;

use async_trait::async_trait;
use urbanflow_core::{JobId, JobStatus, WorkRequest};

use crate::api::QueueError;

/// A remote service that executes jobs and reports their status.
///
/// Both calls may fail. Submission failures are reported per request by
/// the caller; status failures are treated as transient.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Submit one unit of work and return the id the service assigned.
    async fn submit_job(&self, request: &WorkRequest) -> Result<JobId, QueueError>;

    /// Query the current status of a previously submitted job.
    async fn job_status(&self, job_id: JobId) -> Result<JobStatus, QueueError>;
}

#[async_trait]
impl<T: JobService + ?Sized> JobService for Arc<T> {
    async fn submit_job(&self, request: &WorkRequest) -> Result<JobId, QueueError> {
        (**self).submit_job(request).await
    }

    async fn job_status(&self, job_id: JobId) -> Result<JobStatus, QueueError> {
        (**self).job_status(job_id).await
    }
}
