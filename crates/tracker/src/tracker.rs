//! The caller-facing progress tracker.
//!
//! [`ProgressTracker`] owns the state of at most one active batch. A
//! batch moves `Submitting -> Armed -> Done`, or straight to `Done` when
//! nothing was tracked. Calling [`ProgressTracker::submit_batch`] while a
//! batch is still active supersedes it: its poller is cancelled, its
//! completion future resolves to [`TrackerError::Superseded`], and its
//! completion callback never fires.
//!
//! State is only mutated by a fully resolved tick or by a batch reset,
//! inside a short synchronous critical section that is never held across
//! an `.await`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::join_all;
use tokio::sync::{broadcast, oneshot, watch};
use tokio_util::sync::CancellationToken;
use urbanflow_core::{Health, JobId, JobStatus, WorkRequest};
use urbanflow_queue::JobService;

use crate::aggregator::{Batch, StatusResult};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::events::{TrackerEvent, TrackerEventKind};
use crate::poller::Poller;
use crate::state::{BatchPhase, ProgressSnapshot, TickOutcome};
use crate::submitter::{submit_all, SubmissionFailure};

type CompletionCallback = Arc<Mutex<dyn FnMut(Health) + Send + 'static>>;
type CompletionSender = oneshot::Sender<Result<Health, TrackerError>>;

/// Tracks one batch of remote jobs at a time to joint completion.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<Shared>,
}

/// What `submit_batch` returns to the caller.
#[derive(Debug)]
pub struct BatchReceipt {
    pub generation: u64,
    /// Ids that are being tracked.
    pub job_ids: Vec<JobId>,
    /// Requests that never produced a job id.
    pub failures: Vec<SubmissionFailure>,
    pub completion: BatchCompletion,
}

/// One-shot completion signal for a single batch.
#[derive(Debug)]
pub struct BatchCompletion {
    generation: u64,
    rx: oneshot::Receiver<Result<Health, TrackerError>>,
}

impl BatchCompletion {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the batch to settle and return its final health.
    pub async fn wait(self) -> Result<Health, TrackerError> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(TrackerError::Shutdown),
        }
    }
}

struct Shared {
    service: Arc<dyn JobService>,
    config: TrackerConfig,
    state: Mutex<TrackerState>,
    progress_tx: watch::Sender<ProgressSnapshot>,
    event_tx: broadcast::Sender<TrackerEvent>,
    on_complete: Mutex<Option<CompletionCallback>>,
    tick_in_flight: AtomicBool,
    /// Master cancellation token -- cancelled during shutdown.
    shutdown: CancellationToken,
}

#[derive(Default)]
struct TrackerState {
    generation: u64,
    phase: BatchPhase,
    batch: Option<Batch>,
    completion_tx: Option<CompletionSender>,
    poller: Option<Poller>,
}

/// Clears the tick-in-flight flag when a tick ends, however it ends.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Completion work collected under the state lock and performed after
/// it is released.
struct Settlement {
    health: Health,
    completion_tx: Option<CompletionSender>,
}

impl ProgressTracker {
    pub fn new(service: Arc<dyn JobService>, config: TrackerConfig) -> Self {
        let (progress_tx, _) = watch::channel(ProgressSnapshot::default());
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));

        Self {
            inner: Arc::new(Shared {
                service,
                config,
                state: Mutex::new(TrackerState::default()),
                progress_tx,
                event_tx,
                on_complete: Mutex::new(None),
                tick_in_flight: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Submit a new batch, superseding any batch still in progress.
    ///
    /// Requests are submitted concurrently. Only the ids that were
    /// actually returned are tracked; the rest come back as
    /// [`SubmissionFailure`]s. If nothing ends up tracked the batch is
    /// done immediately with `Health::Ok`.
    pub async fn submit_batch(
        &self,
        requests: Vec<WorkRequest>,
    ) -> Result<BatchReceipt, TrackerError> {
        let generation = self.inner.begin_batch()?;

        tracing::info!(generation, requests = requests.len(), "Submitting batch");
        let outcome = submit_all(self.inner.service.as_ref(), &requests).await;

        for failure in &outcome.failures {
            self.inner.publish(
                generation,
                TrackerEventKind::SubmissionFailed {
                    label: failure.label.clone(),
                    reason: failure.reason.clone(),
                },
            );
        }

        let (completion_tx, rx) = oneshot::channel();
        Shared::arm(
            &self.inner,
            generation,
            &outcome.job_ids,
            outcome.failures.len(),
            completion_tx,
        );

        Ok(BatchReceipt {
            generation,
            job_ids: outcome.job_ids,
            failures: outcome.failures,
            completion: BatchCompletion { generation, rx },
        })
    }

    /// Current progress. Never blocks on an in-flight tick.
    pub fn progress(&self) -> ProgressSnapshot {
        self.inner.progress_tx.borrow().clone()
    }

    /// Receiver that is notified after every applied tick and batch
    /// reset.
    pub fn watch_progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.inner.progress_tx.subscribe()
    }

    /// Subscribe to batch lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Register the completion hook, replacing any previous one.
    ///
    /// Called once per batch that settles, with its final health.
    /// Superseded batches never invoke it. Invocations are serialized.
    pub fn on_batch_complete<F>(&self, callback: F)
    where
        F: FnMut(Health) + Send + 'static,
    {
        *lock(&self.inner.on_complete) = Some(Arc::new(Mutex::new(callback)));
    }

    /// Run one poll tick now, independent of the timer.
    ///
    /// Returns [`TickOutcome::Skipped`] if another tick is in flight.
    pub async fn poll_once(&self) -> TickOutcome {
        self.inner.tick(None).await
    }

    /// Whether the timer-driven poller is currently scheduled.
    pub fn is_polling(&self) -> bool {
        lock(&self.inner.state)
            .poller
            .as_ref()
            .is_some_and(Poller::is_running)
    }

    /// Stop polling for good. The active batch's completion resolves to
    /// [`TrackerError::Shutdown`] and further submissions are rejected.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down progress tracker");
        self.inner.shutdown.cancel();

        let mut state = lock(&self.inner.state);
        if let Some(mut poller) = state.poller.take() {
            poller.stop();
        }
        if let Some(tx) = state.completion_tx.take() {
            let _ = tx.send(Err(TrackerError::Shutdown));
        }
        if matches!(state.phase, BatchPhase::Submitting | BatchPhase::Armed) {
            state.phase = BatchPhase::Stopped;
            self.inner
                .progress_tx
                .send_modify(|snapshot| snapshot.phase = BatchPhase::Stopped);
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }
}

impl Shared {
    /// Reset state for a new batch and supersede the previous one.
    fn begin_batch(&self) -> Result<u64, TrackerError> {
        if self.shutdown.is_cancelled() {
            return Err(TrackerError::Shutdown);
        }

        let mut state = lock(&self.state);
        let previous = state.generation;
        let was_active = matches!(state.phase, BatchPhase::Submitting | BatchPhase::Armed);

        if let Some(mut poller) = state.poller.take() {
            poller.stop();
        }
        if let Some(tx) = state.completion_tx.take() {
            let _ = tx.send(Err(TrackerError::Superseded {
                generation: previous,
            }));
        }

        state.generation += 1;
        state.phase = BatchPhase::Submitting;
        state.batch = None;
        let generation = state.generation;

        self.progress_tx
            .send_replace(ProgressSnapshot::reset(generation, BatchPhase::Submitting));
        drop(state);

        if was_active {
            tracing::warn!(
                superseded = previous,
                generation,
                "New batch submitted before the previous one settled; previous batch superseded",
            );
            self.publish(previous, TrackerEventKind::BatchSuperseded);
        }

        Ok(generation)
    }

    /// Install the submitted ids as the active batch and arm the poller.
    fn arm(
        this: &Arc<Self>,
        generation: u64,
        job_ids: &[JobId],
        failed_submissions: usize,
        completion_tx: CompletionSender,
    ) {
        let mut state = lock(&this.state);

        if state.generation != generation {
            // A newer batch started while this one was submitting.
            drop(state);
            tracing::warn!(generation, "Batch superseded during submission; not tracking");
            let _ = completion_tx.send(Err(TrackerError::Superseded { generation }));
            return;
        }
        if this.shutdown.is_cancelled() {
            drop(state);
            let _ = completion_tx.send(Err(TrackerError::Shutdown));
            return;
        }

        let batch = Batch::new(generation, job_ids.iter().copied());
        let total = batch.total();

        if batch.is_complete() {
            let snapshot = batch.snapshot(BatchPhase::Done);
            state.phase = BatchPhase::Done;
            state.batch = Some(batch);
            this.progress_tx.send_replace(snapshot);
            drop(state);

            tracing::info!(generation, failed_submissions, "Batch has no tracked jobs; done");
            this.publish(
                generation,
                TrackerEventKind::BatchStarted {
                    total,
                    failed_submissions,
                },
            );
            this.settle(
                generation,
                Settlement {
                    health: Health::Ok,
                    completion_tx: Some(completion_tx),
                },
            );
            return;
        }

        let snapshot = batch.snapshot(BatchPhase::Armed);
        state.phase = BatchPhase::Armed;
        state.batch = Some(batch);
        state.completion_tx = Some(completion_tx);

        if this.config.auto_poll {
            let mut poller = Poller::new(this.config.poll_interval, &this.shutdown);
            let weak: Weak<Shared> = Arc::downgrade(this);
            poller.start(move || {
                let weak = weak.clone();
                async move {
                    match weak.upgrade() {
                        Some(shared) => shared.tick(Some(generation)).await,
                        None => TickOutcome::Idle,
                    }
                }
            });
            state.poller = Some(poller);
        }

        this.progress_tx.send_replace(snapshot);
        drop(state);

        tracing::info!(generation, total, failed_submissions, "Batch armed");
        this.publish(
            generation,
            TrackerEventKind::BatchStarted {
                total,
                failed_submissions,
            },
        );
    }

    /// One poll cycle: query every outstanding job concurrently, then
    /// apply all results at once.
    ///
    /// `expected` pins the tick to a batch generation; timer ticks pass
    /// the generation they were armed for so they can never touch a
    /// newer batch.
    async fn tick(&self, expected: Option<u64>) -> TickOutcome {
        if self.tick_in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!("Tick already in flight; skipping");
            return TickOutcome::Skipped;
        }
        let _flight = FlightGuard(&self.tick_in_flight);

        if self.shutdown.is_cancelled() {
            return TickOutcome::Idle;
        }

        let (generation, job_ids) = {
            let state = lock(&self.state);
            if expected.is_some_and(|g| g != state.generation) {
                return TickOutcome::Stale;
            }
            match (&state.phase, &state.batch) {
                (BatchPhase::Armed, Some(batch)) => (state.generation, batch.outstanding_ids()),
                _ => return TickOutcome::Idle,
            }
        };

        let results: Vec<StatusResult> = join_all(job_ids.iter().map(|&job_id| async move {
            match self.service.job_status(job_id).await {
                Ok(status) => (job_id, Some(status)),
                Err(e) => {
                    tracing::warn!(
                        generation,
                        job_id,
                        error = %e,
                        "Status query failed; job stays pending",
                    );
                    (job_id, None)
                }
            }
        }))
        .await;

        let (report, snapshot, settlement) = {
            let mut state = lock(&self.state);
            if self.shutdown.is_cancelled() {
                tracing::debug!(generation, "Tracker shut down; discarding tick results");
                return TickOutcome::Idle;
            }
            if state.generation != generation || state.phase != BatchPhase::Armed {
                tracing::debug!(generation, "Discarding results of a superseded batch");
                return TickOutcome::Stale;
            }
            let Some(batch) = state.batch.as_mut() else {
                return TickOutcome::Idle;
            };

            let report = batch.apply_tick(&results);
            let health = batch.health();

            let settlement = if report.completed {
                state.phase = BatchPhase::Done;
                if let Some(mut poller) = state.poller.take() {
                    poller.stop();
                }
                Some(Settlement {
                    health,
                    completion_tx: state.completion_tx.take(),
                })
            } else {
                None
            };

            let snapshot = match state.batch.as_ref() {
                Some(batch) => batch.snapshot(state.phase),
                None => ProgressSnapshot::reset(generation, state.phase),
            };
            self.progress_tx.send_replace(snapshot.clone());
            (report, snapshot, settlement)
        };

        for &(job_id, status) in &report.settled {
            match status {
                JobStatus::Failed => tracing::warn!(generation, job_id, "Job failed"),
                _ => tracing::info!(generation, job_id, %status, "Job settled"),
            }
            self.publish(generation, TrackerEventKind::JobSettled { job_id, status });
        }
        tracing::debug!(
            generation,
            outstanding = snapshot.outstanding,
            unknown = report.unknown,
            fraction = snapshot.fraction,
            "Tick applied",
        );
        self.publish(generation, TrackerEventKind::Progress(snapshot.clone()));

        match settlement {
            Some(settlement) => {
                let health = settlement.health;
                self.settle(generation, settlement);
                TickOutcome::Completed {
                    settled: report.settled,
                    health,
                }
            }
            None => TickOutcome::Applied {
                settled: report.settled,
                outstanding: snapshot.outstanding,
            },
        }
    }

    /// Fire every completion signal for a batch. Runs at most once per
    /// batch because the sender is taken out of state under the lock.
    fn settle(&self, generation: u64, settlement: Settlement) {
        let Settlement {
            health,
            completion_tx,
        } = settlement;

        tracing::info!(generation, %health, "Batch complete");

        if let Some(tx) = completion_tx {
            let _ = tx.send(Ok(health));
        }

        // Clone the handle so the slot lock is released before the call;
        // the callback's own lock serializes concurrent settlements.
        let callback = lock(&self.on_complete).clone();
        if let Some(callback) = callback {
            let mut callback = lock(&callback);
            (*callback)(health);
        }

        self.publish(generation, TrackerEventKind::BatchCompleted { health });
    }

    fn publish(&self, generation: u64, kind: TrackerEventKind) {
        // Ignore the SendError -- it only means there are zero receivers.
        let _ = self.event_tx.send(TrackerEvent::new(generation, kind));
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
