use std::time::Duration;

use urbanflow_core::config::env_or;
use urbanflow_core::CoreError;

/// Default cadence between poll ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Default broadcast channel capacity for tracker events.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Tracker tuning parameters.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Time between poll ticks while a batch is armed.
    pub poll_interval: Duration,
    /// Buffer size of the event broadcast channel. Slow subscribers
    /// observe `RecvError::Lagged` once it fills.
    pub event_channel_capacity: usize,
    /// Start the timer-driven poller when a batch is armed. When `false`
    /// the caller drives ticks with
    /// [`ProgressTracker::poll_once`](crate::ProgressTracker::poll_once).
    pub auto_poll: bool,
}

impl TrackerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default |
    /// |--------------------------|---------|
    /// | `POLL_INTERVAL_MS`       | `1500`  |
    /// | `EVENT_CHANNEL_CAPACITY` | `256`   |
    pub fn from_env() -> Result<Self, CoreError> {
        let poll_interval_ms: u64 =
            env_or("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL.as_millis() as u64)?;
        let event_channel_capacity: usize =
            env_or("EVENT_CHANNEL_CAPACITY", DEFAULT_EVENT_CHANNEL_CAPACITY)?;

        let config = Self {
            poll_interval: Duration::from_millis(poll_interval_ms),
            event_channel_capacity,
            auto_poll: true,
        };
        config.validate()?;
        Ok(config)
    }

    /// A configuration with the timer disabled, for callers that
    /// schedule their own ticks.
    pub fn manual() -> Self {
        Self {
            auto_poll: false,
            ..Default::default()
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval.is_zero() {
            return Err(CoreError::Validation(
                "POLL_INTERVAL_MS must be greater than zero".into(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(CoreError::Validation(
                "EVENT_CHANNEL_CAPACITY must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            auto_poll: true,
        }
    }
}
