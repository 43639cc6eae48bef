/// Errors surfaced to tracker callers.
///
/// Job failures and status query failures are never errors here: the
/// former degrade batch health, the latter are retried on the next tick.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    /// A newer `submit_batch` replaced this batch before it settled.
    #[error("Batch {generation} was superseded by a newer batch")]
    Superseded { generation: u64 },

    /// The tracker was shut down.
    #[error("Tracker has been shut down")]
    Shutdown,
}
