//! Limiter counters.
//!
//! How many checks went through, how many were turned away, and how many
//! stale windows cleanup has thrown out since start (or the last reset).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared, lock-free limiter counters. Cloning hands out another view of
/// the same numbers.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    allowed: AtomicU64,
    denied: AtomicU64,
    swept: AtomicU64,
}

impl Metrics {
    /// All counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_allowed(&self) {
        self.counters.allowed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_denied(&self) {
        self.counters.denied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_swept(&self, count: usize) {
        let count = u64::try_from(count).unwrap_or(u64::MAX);
        self.counters.swept.fetch_add(count, Ordering::Relaxed);
    }

    /// Checks that returned `success = true`.
    pub fn checks_allowed(&self) -> u64 {
        self.counters.allowed.load(Ordering::Relaxed)
    }

    /// Checks that returned `success = false`.
    pub fn checks_denied(&self) -> u64 {
        self.counters.denied.load(Ordering::Relaxed)
    }

    /// Expired windows removed by cleanup or the sweeper.
    pub fn entries_swept(&self) -> u64 {
        self.counters.swept.load(Ordering::Relaxed)
    }

    /// Read every counter. Each is loaded separately, so a snapshot taken
    /// under load may straddle a check.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            checks_allowed: self.checks_allowed(),
            checks_denied: self.checks_denied(),
            entries_swept: self.entries_swept(),
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for counter in [
            &self.counters.allowed,
            &self.counters.denied,
            &self.counters.swept,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Counter values read at one moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub checks_allowed: u64,
    pub checks_denied: u64,
    pub entries_swept: u64,
}

impl MetricsSnapshot {
    /// Allowed plus denied.
    pub fn total_checks(&self) -> u64 {
        self.checks_allowed.saturating_add(self.checks_denied)
    }

    /// Share of checks that were denied, `0.0` when nothing was checked.
    pub fn denial_rate(&self) -> f64 {
        match self.total_checks() {
            0 => 0.0,
            total => self.checks_denied as f64 / total as f64,
        }
    }
}
