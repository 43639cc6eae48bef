//! REST client for the job queue HTTP endpoints.
//!
//! Wraps job creation (`POST /jobs/`) and status lookup
//! (`GET /job/{job_id}`) using [`reqwest`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use urbanflow_core::{CoreError, JobId, JobStatus, WorkRequest};

use crate::config::QueueConfig;
use crate::service::JobService;

/// HTTP client for a single job queue server.
pub struct JobQueueApi {
    client: reqwest::Client,
    api_url: String,
}

/// Body sent to `POST /jobs/`.
#[derive(Debug, Serialize)]
struct CreateJobBody<'a> {
    job_type: &'static str,
    name: String,
    description: String,
    status: &'static str,
    job_args: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner_id: Option<&'a str>,
}

/// Response returned by `POST /jobs/` after the job row is created.
#[derive(Debug, Deserialize)]
pub struct CreateJobResponse {
    /// Server-assigned identifier for the queued job.
    pub job_id: JobId,
}

/// Response returned by `GET /job/{job_id}`.
#[derive(Debug, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: JobId,
    /// Raw status column, e.g. `pending`, `success`, `failed`.
    pub status: String,
}

/// Errors from the job queue REST layer.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The job queue returned a non-2xx status code.
    #[error("Job queue API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The service reported a status string the client does not know.
    #[error("Job {job_id} reported an unknown status: {source}")]
    UnknownStatus {
        job_id: JobId,
        #[source]
        source: CoreError,
    },

    /// The request was rejected before it was sent.
    #[error("Invalid request: {0}")]
    Invalid(#[from] CoreError),
}

impl JobQueueApi {
    /// Create a client from configuration.
    pub fn new(config: &QueueConfig) -> Result<Self, QueueError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config.api_url.clone()))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base HTTP URL of the job queue (e.g. `http://host:8000`).
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Queue a job for the given work request.
    ///
    /// The job row is created with status `pending`; a backend worker
    /// picks it up and later reports the outcome to the queue.
    pub async fn create_job(&self, request: &WorkRequest) -> Result<CreateJobResponse, QueueError> {
        request.validate()?;

        let body = CreateJobBody {
            job_type: request.job_type(),
            name: request.label(),
            description: format!("{} job", request.job_type()),
            status: JobStatus::Pending.as_str(),
            job_args: request.job_args(),
            owner_id: match request {
                WorkRequest::ParcelStats { session_id, .. } => Some(session_id.as_str()),
                _ => None,
            },
        };

        let response = self
            .client
            .post(format!("{}/jobs/", self.api_url))
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Retrieve the raw status row for a job.
    pub async fn get_job(&self, job_id: JobId) -> Result<JobStatusResponse, QueueError> {
        let response = self
            .client
            .get(format!("{}/job/{}", self.api_url, job_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`QueueError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, QueueError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(QueueError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, QueueError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl JobService for JobQueueApi {
    async fn submit_job(&self, request: &WorkRequest) -> Result<JobId, QueueError> {
        let created = self.create_job(request).await?;
        tracing::debug!(
            job_id = created.job_id,
            job_type = request.job_type(),
            "Job queued",
        );
        Ok(created.job_id)
    }

    async fn job_status(&self, job_id: JobId) -> Result<JobStatus, QueueError> {
        let row = self.get_job(job_id).await?;
        JobStatus::from_wire(&row.status)
            .map_err(|source| QueueError::UnknownStatus { job_id, source })
    }
}
