//! Asynchronous multi-job progress tracker.
//!
//! Submits a batch of work requests to the job queue, polls every
//! outstanding job on a fixed cadence, folds the results into a single
//! progress fraction and health flag, and signals completion exactly
//! once when the last job settles.
//!
//! - [`ProgressTracker`]: the caller-facing handle.
//! - [`submitter`]: concurrent submission with per-request failures.
//! - [`poller`]: the timer that drives ticks while a batch is armed.
//! - [`aggregator`]: per-batch bookkeeping applied once per tick.
//! - [`events`]: broadcast feed of batch lifecycle events.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod events;
pub mod poller;
pub mod state;
pub mod submitter;
pub mod tracker;

pub use config::TrackerConfig;
pub use error::TrackerError;
pub use events::{TrackerEvent, TrackerEventKind};
pub use state::{BatchPhase, ProgressSnapshot, TickOutcome};
pub use submitter::SubmissionFailure;
pub use tracker::{BatchCompletion, BatchReceipt, ProgressTracker};
