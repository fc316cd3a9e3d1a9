//! Mock notifier for testing.

use crate::application::ports::{Notifier, Placement};
use std::sync::{Arc, Mutex};

/// A notification captured by [`MockNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Notification {
    pub message: String,
    pub placement: Placement,
}

/// Notifier that records every notification.
///
/// Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    captured: Arc<Mutex<Vec<Notification>>>,
}

impl MockNotifier {
    /// Create a new mock notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all captured notifications.
    pub fn notifications(&self) -> Vec<Notification> {
        self.captured
            .lock()
            .expect("MockNotifier mutex poisoned - a test thread panicked while holding the lock")
            .clone()
    }

    /// Get the count of captured notifications.
    pub fn count(&self) -> usize {
        self.captured
            .lock()
            .expect("MockNotifier mutex poisoned - a test thread panicked while holding the lock")
            .len()
    }
}

impl Notifier for MockNotifier {
    fn notify(&self, message: &str, placement: Placement) {
        self.captured
            .lock()
            .expect("MockNotifier mutex poisoned - a test thread panicked while holding the lock")
            .push(Notification {
                message: message.to_string(),
                placement,
            });
    }
}
