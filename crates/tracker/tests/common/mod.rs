//! Scripted in-memory job queue for tracker tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;
use urbanflow_core::{InvestModel, JobId, JobStatus, WorkRequest};
use urbanflow_queue::{JobService, QueueError};

/// A job queue whose per-job status answers are scripted in advance.
///
/// Ids are assigned sequentially from 1. Each status query pops the next
/// scripted answer for the job; the last answer repeats forever. `None`
/// in a script means the query fails. Unscripted jobs stay pending.
pub struct ScriptedQueue {
    next_id: AtomicI64,
    failing_scenarios: Mutex<HashSet<i64>>,
    scripts: Mutex<HashMap<JobId, VecDeque<Option<JobStatus>>>>,
    status_calls: AtomicUsize,
    calls_per_job: Mutex<HashMap<JobId, usize>>,
    gate_tx: watch::Sender<bool>,
}

impl ScriptedQueue {
    pub fn new() -> Arc<Self> {
        let (gate_tx, _) = watch::channel(true);
        Arc::new(Self {
            next_id: AtomicI64::new(1),
            failing_scenarios: Mutex::new(HashSet::new()),
            scripts: Mutex::new(HashMap::new()),
            status_calls: AtomicUsize::new(0),
            calls_per_job: Mutex::new(HashMap::new()),
            gate_tx,
        })
    }

    /// Script the answers for one job.
    pub fn script(&self, job_id: JobId, answers: impl IntoIterator<Item = Option<JobStatus>>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(job_id, answers.into_iter().collect());
    }

    /// Reject every submission for this scenario.
    pub fn fail_submissions_for(&self, scenario_id: i64) {
        self.failing_scenarios.lock().unwrap().insert(scenario_id);
    }

    /// Block status queries until [`ScriptedQueue::open`] is called.
    pub fn hold(&self) {
        self.gate_tx.send_replace(false);
    }

    pub fn open(&self) {
        self.gate_tx.send_replace(true);
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Status queries issued for one job.
    pub fn calls_for(&self, job_id: JobId) -> usize {
        self.calls_per_job
            .lock()
            .unwrap()
            .get(&job_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl JobService for ScriptedQueue {
    async fn submit_job(&self, request: &WorkRequest) -> Result<JobId, QueueError> {
        let scenario = match request {
            WorkRequest::Invest { scenario_id, .. }
            | WorkRequest::LulcFill { scenario_id, .. }
            | WorkRequest::Wallpaper { scenario_id, .. }
            | WorkRequest::LulcCrop { scenario_id, .. } => Some(*scenario_id),
            WorkRequest::ParcelStats { .. } | WorkRequest::PatternThumbnail { .. } => None,
        };
        if scenario.is_some_and(|s| self.failing_scenarios.lock().unwrap().contains(&s)) {
            return Err(QueueError::Api {
                status: 500,
                body: "worker unavailable".into(),
            });
        }
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn job_status(&self, job_id: JobId) -> Result<JobStatus, QueueError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        *self.calls_per_job.lock().unwrap().entry(job_id).or_default() += 1;

        let mut gate = self.gate_tx.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let answer = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(&job_id) {
                Some(answers) if answers.len() > 1 => answers.pop_front().flatten(),
                Some(answers) => answers.front().copied().flatten(),
                None => Some(JobStatus::Pending),
            }
        };

        answer.ok_or_else(|| QueueError::Api {
            status: 503,
            body: format!("job {job_id} unavailable"),
        })
    }
}

pub fn invest(scenario_id: i64) -> WorkRequest {
    WorkRequest::Invest {
        scenario_id,
        model: InvestModel::Carbon,
        lulc_source_url: "lulc_overlay_3857.tif".into(),
        study_area_wkt: "POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))".into(),
    }
}

pub fn fill(scenario_id: i64) -> WorkRequest {
    WorkRequest::LulcFill {
        scenario_id,
        target_parcel_wkt: "POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))".into(),
        lulc_class: 42,
    }
}
