//! End-to-end runner tests against an in-memory job queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use urbanflow_core::{Health, InvestModel, JobId, JobStatus, WorkRequest};
use urbanflow_queue::{JobService, QueueError};
use urbanflow_runner::run::{run_batch, run_status};
use urbanflow_tracker::{ProgressTracker, TrackerConfig};

/// Jobs settle on the first status query with a preset outcome.
struct InstantQueue {
    next_id: AtomicI64,
    outcomes: Mutex<HashMap<JobId, JobStatus>>,
    reject_model: Option<InvestModel>,
}

impl InstantQueue {
    fn new(outcomes: &[(JobId, JobStatus)], reject_model: Option<InvestModel>) -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicI64::new(1),
            outcomes: Mutex::new(outcomes.iter().copied().collect()),
            reject_model,
        })
    }
}

#[async_trait]
impl JobService for InstantQueue {
    async fn submit_job(&self, request: &WorkRequest) -> Result<JobId, QueueError> {
        if let WorkRequest::Invest { model, .. } = request {
            if Some(*model) == self.reject_model {
                return Err(QueueError::Api {
                    status: 422,
                    body: "model disabled".into(),
                });
            }
        }
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn job_status(&self, job_id: JobId) -> Result<JobStatus, QueueError> {
        Ok(self
            .outcomes
            .lock()
            .unwrap()
            .get(&job_id)
            .copied()
            .unwrap_or(JobStatus::Succeeded))
    }
}

fn suite() -> Vec<WorkRequest> {
    WorkRequest::invest_suite(
        3,
        "lulc_overlay_3857.tif",
        "POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))",
        &InvestModel::ALL,
    )
}

fn tracker(queue: Arc<InstantQueue>) -> ProgressTracker {
    let config = TrackerConfig::default().with_poll_interval(Duration::from_millis(10));
    ProgressTracker::new(queue, config)
}

#[tokio::test]
async fn successful_batch_exits_zero() {
    let tracker = tracker(InstantQueue::new(&[], None));
    let mut out = Vec::new();

    let summary = run_batch(&tracker, suite(), &mut out)
        .await
        .unwrap();

    assert_eq!(summary.health, Health::Ok);
    assert_eq!(summary.job_ids.len(), 3);
    assert_eq!(summary.exit_code(), 0);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("[100%] 3/3 settled, health ok"), "{text}");
    assert!(text.contains("batch 1 finished"));
}

#[tokio::test]
async fn failed_job_exits_nonzero() {
    let tracker = tracker(InstantQueue::new(&[(2, JobStatus::Failed)], None));
    let mut out = Vec::new();

    let summary = run_batch(&tracker, suite(), &mut out)
        .await
        .unwrap();

    assert_eq!(summary.health, Health::Degraded);
    assert_eq!(summary.exit_code(), 1);
    assert!(String::from_utf8(out).unwrap().contains("job 2 failed"));
}

#[tokio::test]
async fn submission_failure_exits_nonzero() {
    let tracker = tracker(InstantQueue::new(&[], Some(InvestModel::Carbon)));
    let mut out = Vec::new();

    let summary = run_batch(&tracker, suite(), &mut out)
        .await
        .unwrap();

    assert_eq!(summary.health, Health::Ok);
    assert_eq!(summary.job_ids.len(), 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.exit_code(), 1);
    assert!(String::from_utf8(out)
        .unwrap()
        .contains("not submitted: carbon for scenario 3"));
}

#[tokio::test]
async fn status_command_prints_one_line() {
    let queue = InstantQueue::new(&[(8, JobStatus::Pending)], None);
    let mut out = Vec::new();

    let status = run_status(queue.as_ref(), 8, &mut out).await.unwrap();

    assert_matches!(status, JobStatus::Pending);
    assert_eq!(String::from_utf8(out).unwrap(), "job 8: pending\n");
}
