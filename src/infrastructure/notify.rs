//! Notification adapters.

use crate::application::ports::{Notifier, Placement};

/// Notifier that emits each notification as an `info` tracing event.
///
/// Useful for server-side hosts with no toast surface; the message still
/// shows up in structured logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    /// Create a new tracing notifier.
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, placement: Placement) {
        tracing::info!(placement = placement.as_str(), "{}", message);
    }
}
