//! Timer that drives poll ticks while a batch is armed.
//!
//! A [`Poller`] owns one background task. The task waits one interval,
//! runs a tick to completion, and repeats until the tick reports that
//! polling should stop or the poller is stopped. Ticks run back to back
//! on the same task, so a slow tick delays the next one instead of
//! overlapping it.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::state::TickOutcome;

/// Scheduler for one batch's poll ticks.
pub struct Poller {
    interval: Duration,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Create a stopped poller. `parent` cancels it on tracker shutdown.
    pub fn new(interval: Duration, parent: &CancellationToken) -> Self {
        Self {
            interval,
            cancel: parent.child_token(),
            handle: None,
        }
    }

    /// Spawn the tick loop. Calling `start` on a running poller is a
    /// no-op.
    ///
    /// `tick` is invoked once per interval; the loop ends when it returns
    /// an outcome for which [`TickOutcome::keeps_polling`] is false.
    pub fn start<F, Fut>(&mut self, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = TickOutcome> + Send + 'static,
    {
        if self.is_running() {
            return;
        }

        let cancel = self.cancel.clone();
        let interval = self.interval;

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::debug!("Poller stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let outcome = tick().await;
                        if !outcome.keeps_polling() {
                            tracing::debug!(?outcome, "Poller disarmed");
                            break;
                        }
                    }
                }
            }
        }));
    }

    /// Stop ticking. A tick already in flight finishes, but no further
    /// tick is scheduled.
    pub fn stop(&mut self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
