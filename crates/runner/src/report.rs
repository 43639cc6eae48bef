//! Human-readable progress and summary lines.

use urbanflow_core::{Health, JobId};
use urbanflow_tracker::{ProgressSnapshot, SubmissionFailure, TrackerEvent, TrackerEventKind};

/// Final result of one tracked batch.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub generation: u64,
    pub job_ids: Vec<JobId>,
    pub failures: Vec<SubmissionFailure>,
    pub health: Health,
}

impl RunSummary {
    /// Every job succeeded and every request was submitted.
    pub fn is_success(&self) -> bool {
        self.health.is_ok() && self.failures.is_empty()
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "batch {} finished: {} job(s) tracked, {} submission failure(s), health {}",
            self.generation,
            self.job_ids.len(),
            self.failures.len(),
            self.health,
        )];
        lines.extend(self.failures.iter().map(failure_line));
        lines
    }
}

pub fn progress_line(snapshot: &ProgressSnapshot) -> String {
    format!(
        "[{:>3}%] {}/{} settled, health {}",
        snapshot.percent(),
        snapshot.total - snapshot.outstanding,
        snapshot.total,
        snapshot.health,
    )
}

pub fn failure_line(failure: &SubmissionFailure) -> String {
    format!("  not submitted: {} ({})", failure.label, failure.reason)
}

/// The line to print for an event, if any.
pub fn event_line(event: &TrackerEvent) -> Option<String> {
    match &event.kind {
        TrackerEventKind::BatchStarted {
            total,
            failed_submissions,
        } => Some(format!(
            "tracking {total} job(s), {failed_submissions} failed to submit"
        )),
        TrackerEventKind::JobSettled { job_id, status } => {
            Some(format!("  job {job_id} {status}"))
        }
        TrackerEventKind::Progress(snapshot) => Some(progress_line(snapshot)),
        TrackerEventKind::SubmissionFailed { .. }
        | TrackerEventKind::BatchCompleted { .. }
        | TrackerEventKind::BatchSuperseded => None,
    }
}

#[cfg(test)]
mod tests {
    use urbanflow_core::JobStatus;
    use urbanflow_tracker::BatchPhase;

    use super::*;

    fn summary(health: Health, failures: usize) -> RunSummary {
        RunSummary {
            generation: 1,
            job_ids: vec![1, 2],
            failures: (0..failures)
                .map(|index| SubmissionFailure {
                    index,
                    job_type: "invest",
                    label: "carbon for scenario 3".into(),
                    reason: "Job queue API error (500): boom".into(),
                })
                .collect(),
            health,
        }
    }

    #[test]
    fn exit_code_requires_ok_health_and_no_failures() {
        assert_eq!(summary(Health::Ok, 0).exit_code(), 0);
        assert_eq!(summary(Health::Degraded, 0).exit_code(), 1);
        assert_eq!(summary(Health::Ok, 1).exit_code(), 1);
    }

    #[test]
    fn summary_lists_failures() {
        let lines = summary(Health::Ok, 1).lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("1 submission failure"));
        assert!(lines[1].contains("carbon for scenario 3"));
    }

    #[test]
    fn progress_line_shows_percent_and_counts() {
        let snapshot = ProgressSnapshot {
            generation: 1,
            phase: BatchPhase::Armed,
            fraction: 1.0 / 3.0,
            health: Health::Ok,
            outstanding: 2,
            total: 3,
        };
        assert_eq!(progress_line(&snapshot), "[ 33%] 1/3 settled, health ok");
    }

    #[test]
    fn settled_jobs_are_printed() {
        let event = TrackerEvent::new(
            1,
            TrackerEventKind::JobSettled {
                job_id: 9,
                status: JobStatus::Failed,
            },
        );
        assert_eq!(event_line(&event).unwrap(), "  job 9 failed");
    }
}
