//! Periodic cleanup of expired rate limit windows.
//!
//! The sweeper removes expired windows on a fixed interval so that keys
//! which are never checked again do not accumulate. Lazy expiry in
//! [`RateLimiter::check`] keeps decisions correct without it; the sweep only
//! bounds memory.

use crate::application::{limiter::RateLimiter, ports::Storage};
use crate::domain::window::WindowEntry;
use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "async")]
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

/// Default sweep interval: 10 minutes.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Error returned when sweeper configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SweeperConfigError {
    /// Sweep interval duration must be greater than zero
    #[error("sweep interval must be greater than 0")]
    ZeroInterval,
}

/// Configuration for the cleanup sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// How often to sweep
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl SweeperConfig {
    /// Create a new sweeper config with the specified interval.
    ///
    /// # Errors
    /// Returns `SweeperConfigError::ZeroInterval` if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self, SweeperConfigError> {
        if interval.is_zero() {
            return Err(SweeperConfigError::ZeroInterval);
        }
        Ok(Self { interval })
    }
}

/// Runs [`RateLimiter::cleanup`] on a fixed interval.
#[derive(Debug)]
pub struct CleanupSweeper<S>
where
    S: Storage<String, WindowEntry> + Clone,
{
    limiter: RateLimiter<S>,
    config: SweeperConfig,
}

impl<S> CleanupSweeper<S>
where
    S: Storage<String, WindowEntry> + Clone,
{
    /// Create a new sweeper over a limiter (sharing its state).
    pub fn new(limiter: RateLimiter<S>, config: SweeperConfig) -> Self {
        Self { limiter, config }
    }

    /// Run one sweep now. Returns the number of windows removed.
    pub fn sweep(&self) -> usize {
        self.limiter.cleanup()
    }

    /// Start sweeping periodically on the current tokio runtime.
    ///
    /// The first sweep happens one interval after start. The task runs
    /// until [`SweeperHandle::shutdown`] or [`SweeperHandle::abort`] is
    /// called; dropping the handle leaves it running.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    #[cfg(feature = "async")]
    pub fn start(self) -> SweeperHandle
    where
        S: Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let period = self.config.interval;

        let join_handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_secs = period.as_secs(), "rate limit sweeper started");

            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        self.sweep();
                    }
                }
            }

            tracing::info!("rate limit sweeper stopped");
        });

        SweeperHandle {
            shutdown_tx: Some(shutdown_tx),
            join_handle,
        }
    }

    /// Get the sweeper configuration.
    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }
}

/// Error returned when the sweeper task does not stop cleanly.
#[cfg(feature = "async")]
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The task panicked
    #[error("sweeper task panicked")]
    TaskPanicked,
    /// The task was cancelled before it could finish
    #[error("sweeper task was cancelled")]
    TaskCancelled,
}

/// Handle to a running sweeper task.
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: JoinHandle<()>,
}

#[cfg(feature = "async")]
impl SweeperHandle {
    /// Signal the task to stop and wait for it to finish.
    ///
    /// # Errors
    /// Returns `ShutdownError` if the task panicked or was aborted.
    pub async fn shutdown(mut self) -> Result<(), ShutdownError> {
        if let Some(tx) = self.shutdown_tx.take() {
            // The receiver is gone only if the task already ended; the join
            // below reports how.
            let _ = tx.send(());
        }

        match self.join_handle.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_panic() => Err(ShutdownError::TaskPanicked),
            Err(_) => Err(ShutdownError::TaskCancelled),
        }
    }

    /// Stop the task without waiting for it.
    ///
    /// A later [`shutdown`](Self::shutdown) reports
    /// `ShutdownError::TaskCancelled` unless the task had already ended.
    pub fn abort(&self) {
        self.join_handle.abort();
    }

    /// Check if the task has ended.
    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }
}
