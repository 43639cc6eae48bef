//! Per-batch bookkeeping: outstanding jobs, health and progress.
//!
//! A [`Batch`] is mutated only by [`Batch::apply_tick`], once per fully
//! resolved tick. The next outstanding set is rebuilt from scratch on
//! every tick, so any number of jobs settling together are all removed.

use std::collections::{BTreeSet, HashMap};

use urbanflow_core::{Health, JobId, JobStatus};

use crate::state::{BatchPhase, ProgressSnapshot};

/// Result of one status query in a tick. `None` means the status is
/// unknown this tick (the query failed).
pub type StatusResult = (JobId, Option<JobStatus>);

/// Tracker bookkeeping for one submitted batch.
#[derive(Debug, Clone)]
pub struct Batch {
    generation: u64,
    total: usize,
    outstanding: BTreeSet<JobId>,
    health: Health,
}

/// What changed when a tick was applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Jobs that reached a terminal status in this tick.
    pub settled: Vec<(JobId, JobStatus)>,
    /// Outstanding jobs whose status could not be determined.
    pub unknown: usize,
    /// Whether this tick emptied the outstanding set.
    pub completed: bool,
}

impl Batch {
    /// Start tracking the given job ids. Duplicates collapse.
    pub fn new(generation: u64, job_ids: impl IntoIterator<Item = JobId>) -> Self {
        let outstanding: BTreeSet<JobId> = job_ids.into_iter().collect();
        Self {
            generation,
            total: outstanding.len(),
            outstanding,
            health: Health::Ok,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn health(&self) -> Health {
        self.health
    }

    pub fn outstanding_len(&self) -> usize {
        self.outstanding.len()
    }

    /// Ids still awaiting a terminal status, in ascending order.
    pub fn outstanding_ids(&self) -> Vec<JobId> {
        self.outstanding.iter().copied().collect()
    }

    pub fn is_complete(&self) -> bool {
        self.outstanding.is_empty()
    }

    /// Completed fraction of the batch. An empty batch is complete.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.total - self.outstanding.len()) as f64 / self.total as f64
    }

    /// Fold one tick's results into the batch.
    ///
    /// Results for ids that are not outstanding are ignored, so a late
    /// answer can never resurrect or double-count a settled job.
    pub fn apply_tick(&mut self, results: &[StatusResult]) -> TickReport {
        let by_id: HashMap<JobId, Option<JobStatus>> = results.iter().copied().collect();

        let mut report = TickReport::default();
        let mut next = BTreeSet::new();

        for &job_id in &self.outstanding {
            match by_id.get(&job_id).copied().flatten() {
                Some(status) if status.is_terminal() => {
                    self.health = self.health.absorb(status);
                    report.settled.push((job_id, status));
                }
                Some(_) => {
                    next.insert(job_id);
                }
                None => {
                    report.unknown += 1;
                    next.insert(job_id);
                }
            }
        }

        self.outstanding = next;
        report.completed = self.outstanding.is_empty();
        report
    }

    /// Progress snapshot for this batch in the given phase.
    pub fn snapshot(&self, phase: BatchPhase) -> ProgressSnapshot {
        ProgressSnapshot {
            generation: self.generation,
            phase,
            fraction: self.fraction(),
            health: self.health,
            outstanding: self.outstanding.len(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use JobStatus::{Failed, Pending, Succeeded};

    #[test]
    fn new_batch_starts_at_zero_progress() {
        let batch = Batch::new(1, [10, 11, 12]);
        assert_eq!(batch.total(), 3);
        assert_eq!(batch.fraction(), 0.0);
        assert_eq!(batch.health(), Health::Ok);
        assert!(!batch.is_complete());
    }

    #[test]
    fn duplicate_ids_collapse() {
        let batch = Batch::new(1, [5, 5, 6]);
        assert_eq!(batch.total(), 2);
    }

    #[test]
    fn empty_batch_is_complete() {
        let batch = Batch::new(1, []);
        assert!(batch.is_complete());
        assert_eq!(batch.fraction(), 1.0);
    }

    #[test]
    fn three_job_scenario() {
        let mut batch = Batch::new(1, [1, 2, 3]);

        let report = batch.apply_tick(&[(1, Some(Pending)), (2, Some(Succeeded)), (3, Some(Pending))]);
        assert_eq!(report.settled, vec![(2, Succeeded)]);
        assert!(!report.completed);
        assert!((batch.fraction() - 1.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(batch.health(), Health::Ok);

        let report = batch.apply_tick(&[(1, Some(Succeeded)), (3, Some(Failed))]);
        assert!(report.completed);
        assert_eq!(batch.fraction(), 1.0);
        assert_eq!(batch.health(), Health::Degraded);
    }

    #[test]
    fn adjacent_jobs_settling_together_are_all_removed() {
        let mut batch = Batch::new(1, [1, 2, 3, 4]);
        let report = batch.apply_tick(&[
            (1, Some(Succeeded)),
            (2, Some(Succeeded)),
            (3, Some(Failed)),
            (4, Some(Pending)),
        ]);
        assert_eq!(report.settled.len(), 3);
        assert_eq!(batch.outstanding_ids(), vec![4]);
    }

    #[test]
    fn failed_query_keeps_job_outstanding() {
        let mut batch = Batch::new(1, [1, 2]);
        let report = batch.apply_tick(&[(1, None), (2, Some(Succeeded))]);
        assert_eq!(report.unknown, 1);
        assert_eq!(batch.outstanding_ids(), vec![1]);
    }

    #[test]
    fn missing_result_is_treated_as_unknown() {
        let mut batch = Batch::new(1, [1, 2]);
        let report = batch.apply_tick(&[(2, Some(Pending))]);
        assert_eq!(report.unknown, 1);
        assert_eq!(batch.outstanding_len(), 2);
    }

    #[test]
    fn results_for_foreign_ids_are_ignored() {
        let mut batch = Batch::new(1, [1]);
        let report = batch.apply_tick(&[(99, Some(Failed)), (1, Some(Pending))]);
        assert!(report.settled.is_empty());
        assert_eq!(batch.health(), Health::Ok);
        assert_eq!(batch.total(), 1);
    }

    #[test]
    fn progress_never_decreases() {
        let mut batch = Batch::new(1, [1, 2, 3, 4, 5]);
        let ticks: Vec<Vec<StatusResult>> = vec![
            vec![(1, Some(Succeeded)), (2, None), (3, Some(Pending)), (4, Some(Pending)), (5, Some(Pending))],
            vec![(2, Some(Pending)), (3, None), (4, None), (5, None)],
            vec![(2, Some(Failed)), (3, Some(Succeeded)), (4, Some(Pending)), (5, Some(Succeeded))],
            vec![(4, Some(Succeeded))],
        ];

        let mut last = batch.fraction();
        for tick in &ticks {
            batch.apply_tick(tick);
            assert!(batch.fraction() >= last);
            last = batch.fraction();
        }
        assert_eq!(last, 1.0);
        assert!(batch.is_complete());
    }

    #[test]
    fn degraded_health_survives_later_successes() {
        let mut batch = Batch::new(1, [1, 2, 3]);
        batch.apply_tick(&[(1, Some(Failed)), (2, Some(Pending)), (3, Some(Pending))]);
        batch.apply_tick(&[(2, Some(Succeeded)), (3, Some(Succeeded))]);
        assert_eq!(batch.health(), Health::Degraded);
    }

    #[test]
    fn snapshot_reflects_counts() {
        let mut batch = Batch::new(4, [1, 2]);
        batch.apply_tick(&[(1, Some(Succeeded)), (2, Some(Pending))]);
        let snap = batch.snapshot(BatchPhase::Armed);
        assert_eq!(snap.generation, 4);
        assert_eq!(snap.total, 2);
        assert_eq!(snap.outstanding, 1);
        assert_eq!(snap.fraction, 0.5);
    }
}
