//! Observable tracker state: batch phase, progress snapshots and tick
//! outcomes.

use serde::Serialize;
use urbanflow_core::{Health, JobId, JobStatus};

/// Lifecycle phase of the tracker's current batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    /// No batch has been submitted yet.
    #[default]
    Idle,
    /// A new batch's submissions are in flight.
    Submitting,
    /// Jobs are outstanding and the poller is ticking.
    Armed,
    /// Every job settled; completion has fired.
    Done,
    /// The tracker was shut down before the batch settled.
    Stopped,
}

/// Point-in-time view of batch progress.
///
/// Snapshots only ever reflect fully applied ticks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub generation: u64,
    pub phase: BatchPhase,
    /// `(total - outstanding) / total`, in `[0, 1]`.
    pub fraction: f64,
    pub health: Health,
    pub outstanding: usize,
    pub total: usize,
}

impl ProgressSnapshot {
    /// Snapshot for a tracker that has not started (or has just reset
    /// for) a batch.
    pub fn reset(generation: u64, phase: BatchPhase) -> Self {
        Self {
            generation,
            phase,
            fraction: 0.0,
            health: Health::Ok,
            outstanding: 0,
            total: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase == BatchPhase::Done
    }

    /// Whole-number percentage, for progress bars.
    pub fn percent(&self) -> u8 {
        (self.fraction * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self::reset(0, BatchPhase::Idle)
    }
}

/// What a single poll tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No batch is armed; nothing was queried.
    Idle,
    /// Another tick was still in flight, so this one did nothing.
    Skipped,
    /// The batch was superseded while the tick's queries were in flight;
    /// the results were discarded.
    Stale,
    /// Results were applied and jobs remain outstanding.
    Applied {
        settled: Vec<(JobId, JobStatus)>,
        outstanding: usize,
    },
    /// The last outstanding job settled in this tick.
    Completed {
        settled: Vec<(JobId, JobStatus)>,
        health: Health,
    },
}

impl TickOutcome {
    /// Whether the poller should keep ticking after this outcome.
    pub fn keeps_polling(&self) -> bool {
        matches!(self, TickOutcome::Skipped | TickOutcome::Applied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_snapshot_starts_at_zero() {
        let snap = ProgressSnapshot::reset(3, BatchPhase::Submitting);
        assert_eq!(snap.generation, 3);
        assert_eq!(snap.fraction, 0.0);
        assert_eq!(snap.health, Health::Ok);
        assert!(!snap.is_done());
    }

    #[test]
    fn percent_rounds_fraction() {
        let snap = ProgressSnapshot {
            fraction: 1.0 / 3.0,
            ..Default::default()
        };
        assert_eq!(snap.percent(), 33);
    }

    #[test]
    fn only_applied_and_skipped_keep_polling() {
        assert!(TickOutcome::Skipped.keeps_polling());
        assert!(TickOutcome::Applied {
            settled: vec![],
            outstanding: 1
        }
        .keeps_polling());
        assert!(!TickOutcome::Idle.keeps_polling());
        assert!(!TickOutcome::Stale.keeps_polling());
        assert!(!TickOutcome::Completed {
            settled: vec![],
            health: Health::Ok
        }
        .keeps_polling());
    }
}
