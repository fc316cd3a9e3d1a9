//! Rate limiter coordination logic.
//!
//! The rate limiter decides whether an attempt may proceed using a
//! fixed-window counter per key, and removes expired windows on request.

use crate::application::metrics::Metrics;
use crate::application::ports::Storage;
use crate::application::registry::WindowRegistry;
use crate::domain::window::{RateLimitConfig, RateLimitResult, WindowEntry};

/// Coordinates rate limiting decisions.
///
/// Clones share state: the registry, its storage and the metrics.
#[derive(Clone, Debug)]
pub struct RateLimiter<S>
where
    S: Storage<String, WindowEntry> + Clone,
{
    registry: WindowRegistry<S>,
    metrics: Metrics,
}

impl<S> RateLimiter<S>
where
    S: Storage<String, WindowEntry> + Clone,
{
    /// Create a new rate limiter.
    ///
    /// # Arguments
    /// * `registry` - The window registry (which contains the clock)
    /// * `metrics` - Metrics tracker
    pub fn new(registry: WindowRegistry<S>, metrics: Metrics) -> Self {
        Self { registry, metrics }
    }

    /// Record an attempt for `key` and decide whether it may proceed.
    ///
    /// Denial is reported in the result, never as an error. The caller
    /// composes `key` so that distinct actions and subjects never collide
    /// (see [`RateLimitKey`](crate::RateLimitKey)); an empty key is a
    /// programming error.
    ///
    /// The whole read-check-write runs under the storage's entry lock.
    pub fn check(&self, key: &str, config: &RateLimitConfig) -> RateLimitResult {
        debug_assert!(!key.is_empty(), "rate limit key must not be empty");

        let result = self
            .registry
            .with_window(key, |entry, now| entry.register_attempt(now, config));

        if result.success {
            self.metrics.record_allowed();
            tracing::debug!(
                key,
                remaining = result.remaining,
                reset_time = result.reset_time,
                "rate limit check allowed"
            );
        } else {
            self.metrics.record_denied();
            tracing::warn!(
                key,
                max_attempts = config.max_attempts(),
                reset_time = result.reset_time,
                "rate limit exceeded"
            );
        }

        result
    }

    /// Remove every window whose reset time has passed.
    ///
    /// Idempotent and safe to run concurrently with `check`. Returns the
    /// number of windows removed.
    pub fn cleanup(&self) -> usize {
        let removed = self.registry.remove_expired();
        self.metrics.record_swept(removed);
        tracing::debug!(removed, remaining = self.registry.len(), "rate limit cleanup");
        removed
    }

    /// Forget all attempts recorded for `key`.
    pub fn reset(&self, key: &str) -> bool {
        self.registry.remove(key)
    }

    /// Get a reference to the registry.
    pub fn registry(&self) -> &WindowRegistry<S> {
        &self.registry
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
