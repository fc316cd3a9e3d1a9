//! Ready-to-use rate limiting service.
//!
//! Wires a [`RateLimiter`] over sharded in-memory storage and a clock, with
//! an optional background sweeper.

use crate::application::{
    limiter::RateLimiter,
    metrics::Metrics,
    ports::Clock,
    registry::WindowRegistry,
    sweeper::{SweeperConfig, SweeperConfigError, DEFAULT_SWEEP_INTERVAL},
};
use crate::domain::key::{KeyError, RateLimitKey};
use crate::domain::window::{RateLimitConfig, RateLimitResult, WindowEntry};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::storage::ShardedStorage;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "async")]
use crate::application::sweeper::{CleanupSweeper, ShutdownError, SweeperHandle};
#[cfg(feature = "async")]
use std::sync::{Mutex, PoisonError};

type WindowStorage = Arc<ShardedStorage<String, WindowEntry>>;

/// Error returned when building a [`RateLimitService`] fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Sweeper configuration validation failed
    #[error("sweeper configuration error: {0}")]
    SweeperConfig(#[from] SweeperConfigError),
    /// Active sweeping was requested outside a tokio runtime
    #[error("active sweeping requires a running tokio runtime")]
    NoRuntime,
}

/// Builder for constructing a [`RateLimitService`].
pub struct RateLimitServiceBuilder {
    clock: Option<Arc<dyn Clock>>,
    sweep_interval: Duration,
    active_sweeping: bool,
}

impl RateLimitServiceBuilder {
    /// Use a custom clock (e.g. a mock clock in tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set how often expired windows are swept.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sweep expired windows in a background task.
    ///
    /// Requires the `async` feature and a running tokio runtime at
    /// [`build`](Self::build) time. Call [`RateLimitService::shutdown`]
    /// before dropping the service to stop the task.
    #[cfg(feature = "async")]
    pub fn with_active_sweeping(mut self, enabled: bool) -> Self {
        self.active_sweeping = enabled;
        self
    }

    /// Build the service.
    ///
    /// # Errors
    /// Returns `BuildError` if the sweep interval is zero, or if active
    /// sweeping was requested with no tokio runtime running.
    pub fn build(self) -> Result<RateLimitService, BuildError> {
        let sweeper_config = SweeperConfig::new(self.sweep_interval)?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let storage: WindowStorage = Arc::new(ShardedStorage::new());
        let registry = WindowRegistry::new(storage, clock);
        let limiter = RateLimiter::new(registry, Metrics::new());

        #[cfg(feature = "async")]
        let sweeper_handle = if self.active_sweeping {
            if tokio::runtime::Handle::try_current().is_err() {
                return Err(BuildError::NoRuntime);
            }
            let sweeper = CleanupSweeper::new(limiter.clone(), sweeper_config.clone());
            Arc::new(Mutex::new(Some(sweeper.start())))
        } else {
            Arc::new(Mutex::new(None))
        };

        #[cfg(not(feature = "async"))]
        let _ = self.active_sweeping;

        Ok(RateLimitService {
            limiter,
            sweeper_config,
            #[cfg(feature = "async")]
            sweeper_handle,
        })
    }
}

/// In-memory fixed-window rate limiting.
///
/// Clones share the same windows, metrics and sweeper.
///
/// # Example
/// ```
/// use tavern_core::{RateLimitConfig, RateLimitService};
///
/// let service = RateLimitService::builder().build().unwrap();
/// let login = RateLimitConfig::login();
///
/// let result = service.check_action("login", "203.0.113.4", &login).unwrap();
/// assert!(result.success);
/// assert_eq!(result.remaining, 4);
/// ```
#[derive(Clone)]
pub struct RateLimitService {
    limiter: RateLimiter<WindowStorage>,
    sweeper_config: SweeperConfig,
    #[cfg(feature = "async")]
    sweeper_handle: Arc<Mutex<Option<SweeperHandle>>>,
}

impl RateLimitService {
    /// Create a builder.
    ///
    /// Defaults:
    /// - Clock: system wall clock
    /// - Sweep interval: 10 minutes
    /// - Active sweeping: disabled
    pub fn builder() -> RateLimitServiceBuilder {
        RateLimitServiceBuilder {
            clock: None,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            active_sweeping: false,
        }
    }

    /// Record an attempt against a pre-composed key.
    pub fn check(&self, key: &str, config: &RateLimitConfig) -> RateLimitResult {
        self.limiter.check(key, config)
    }

    /// Record an attempt for `subject` performing `action`.
    ///
    /// # Errors
    /// Returns `KeyError` if either segment is empty or the action contains
    /// the key separator.
    pub fn check_action(
        &self,
        action: &str,
        subject: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, KeyError> {
        let key = RateLimitKey::new(action, subject)?;
        Ok(self.limiter.check(key.as_str(), config))
    }

    /// Remove expired windows now. Returns the number removed.
    pub fn cleanup(&self) -> usize {
        self.limiter.cleanup()
    }

    /// Forget a key, e.g. after a successful login.
    pub fn reset(&self, key: &str) -> bool {
        self.limiter.reset(key)
    }

    /// Get the metrics.
    pub fn metrics(&self) -> &Metrics {
        self.limiter.metrics()
    }

    /// Number of windows currently held, expired or not.
    pub fn entry_count(&self) -> usize {
        self.limiter.registry().len()
    }

    /// Get the underlying limiter.
    pub fn limiter(&self) -> &RateLimiter<WindowStorage> {
        &self.limiter
    }

    /// Get the sweeper configuration.
    pub fn sweeper_config(&self) -> &SweeperConfig {
        &self.sweeper_config
    }

    /// Check if a background sweeper is running.
    #[cfg(feature = "async")]
    pub fn is_sweeping(&self) -> bool {
        self.sweeper_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the background sweeper, if any, and wait for it.
    ///
    /// Dropping the service does not stop the sweeper. Calling this more
    /// than once is harmless.
    ///
    /// # Errors
    /// Returns `ShutdownError` if the sweeper task panicked or was
    /// cancelled.
    #[cfg(feature = "async")]
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        // Release the lock before awaiting.
        let handle = self
            .sweeper_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            handle.shutdown().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for RateLimitService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitService")
            .field("entries", &self.entry_count())
            .field("sweep_interval", &self.sweeper_config.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MockClock;

    fn service(clock: &MockClock) -> RateLimitService {
        RateLimitService::builder()
            .with_clock(Arc::new(clock.clone()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let result = RateLimitService::builder()
            .with_sweep_interval(Duration::ZERO)
            .build();
        assert_eq!(
            result.unwrap_err(),
            BuildError::SweeperConfig(SweeperConfigError::ZeroInterval)
        );
    }

    #[test]
    fn test_check_action_composes_key() {
        let clock = MockClock::default();
        let service = service(&clock);
        let config = RateLimitConfig::new(1, 60).unwrap();

        assert!(service.check_action("login", "1.2.3.4", &config).unwrap().success);
        assert!(!service.check("ratelimit:login:1.2.3.4", &config).success);
        assert_eq!(service.entry_count(), 1);
    }

    #[test]
    fn test_check_action_rejects_bad_segments() {
        let service = service(&MockClock::default());
        let config = RateLimitConfig::api();

        assert_eq!(
            service.check_action("", "1.2.3.4", &config),
            Err(KeyError::EmptyAction)
        );
        assert_eq!(service.entry_count(), 0);
    }

    #[test]
    fn test_reset_and_cleanup() {
        let clock = MockClock::default();
        let service = service(&clock);
        let config = RateLimitConfig::new(1, 10).unwrap();

        service.check("a", &config);
        service.check("b", &config);
        assert!(service.reset("a"));
        assert!(!service.reset("a"));

        clock.advance(Duration::from_secs(10));
        assert_eq!(service.cleanup(), 1);
        assert_eq!(service.entry_count(), 0);
        assert_eq!(service.metrics().entries_swept(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let clock = MockClock::default();
        let service = service(&clock);
        let other = service.clone();
        let config = RateLimitConfig::new(1, 60).unwrap();

        service.check("k", &config);
        assert!(!other.check("k", &config).success);
        assert_eq!(other.metrics().checks_denied(), 1);
    }

    #[cfg(feature = "async")]
    #[test]
    fn test_active_sweeping_needs_runtime() {
        let result = RateLimitService::builder()
            .with_active_sweeping(true)
            .build();
        assert_eq!(result.unwrap_err(), BuildError::NoRuntime);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_shutdown_without_sweeper() {
        let service = service(&MockClock::default());
        assert!(!service.is_sweeping());
        service.shutdown().await.unwrap();
    }

    #[cfg(feature = "async")]
    #[tokio::test(start_paused = true)]
    async fn test_active_sweeping_removes_expired() {
        let clock = MockClock::default();
        let service = RateLimitService::builder()
            .with_clock(Arc::new(clock.clone()))
            .with_sweep_interval(Duration::from_secs(30))
            .with_active_sweeping(true)
            .build()
            .unwrap();
        assert!(service.is_sweeping());

        service.check("k", &RateLimitConfig::new(1, 5).unwrap());
        clock.advance(Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert_eq!(service.entry_count(), 0);
        service.shutdown().await.unwrap();
        assert!(!service.is_sweeping());
        service.shutdown().await.unwrap();
    }
}
