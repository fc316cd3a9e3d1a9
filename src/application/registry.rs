//! Central registry of attempt windows.
//!
//! The registry maps each rate limit key to its fixed-window counter and
//! supplies the current time to every access.

use crate::application::ports::{Clock, Storage};
use crate::domain::window::WindowEntry;
use std::sync::Arc;

/// Registry managing all attempt windows.
///
/// Uses the Storage port for concurrent access.
///
/// This type is generic over the storage implementation, allowing different
/// storage backends to be used. In production, use `Arc<ShardedStorage>`.
#[derive(Clone)]
pub struct WindowRegistry<S>
where
    S: Storage<String, WindowEntry> + Clone,
{
    storage: S,
    clock: Arc<dyn Clock>,
}

impl<S> WindowRegistry<S>
where
    S: Storage<String, WindowEntry> + Clone,
{
    /// Create a new registry over storage and a clock.
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Access or create the window for a key with a callback.
    ///
    /// A missing window is created vacant (already expired), so callers see
    /// a fresh key and a stale one the same way. The callback receives the
    /// window and the current time in epoch milliseconds.
    pub fn with_window<F, R>(&self, key: &str, f: F) -> R
    where
        F: FnOnce(&mut WindowEntry, u64) -> R,
    {
        let now = self.clock.now_millis();
        self.storage.with_entry_mut(
            key.to_string(),
            || WindowEntry::vacant(now),
            |entry| f(entry, now),
        )
    }

    /// Forget a key entirely.
    pub fn remove(&self, key: &str) -> bool {
        self.storage.remove(&key.to_string())
    }

    /// Current time according to the registry's clock.
    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Get the number of tracked keys.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Clear all tracked state.
    pub fn clear(&self) {
        self.storage.clear();
    }

    /// Iterate over all windows with a callback.
    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&String, &WindowEntry),
    {
        self.storage.for_each(f);
    }

    /// Remove every window whose reset time has passed.
    ///
    /// Returns the number of windows removed.
    pub fn remove_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut removed = 0;
        self.storage.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }
}

impl<S> std::fmt::Debug for WindowRegistry<S>
where
    S: Storage<String, WindowEntry> + Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowRegistry")
            .field("storage", &self.storage)
            .field("clock", &self.clock)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::window::RateLimitConfig;
    use crate::infrastructure::mocks::MockClock;
    use crate::infrastructure::storage::ShardedStorage;
    use std::time::Duration;

    fn registry(clock: &MockClock) -> WindowRegistry<Arc<ShardedStorage<String, WindowEntry>>> {
        WindowRegistry::new(Arc::new(ShardedStorage::new()), Arc::new(clock.clone()))
    }

    #[test]
    fn test_with_window_creates_vacant_entry() {
        let clock = MockClock::new(5_000);
        let registry = registry(&clock);

        let (count, now) = registry.with_window("k", |entry, now| (entry.count(), now));

        assert_eq!(count, 0);
        assert_eq!(now, 5_000);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_expired_keeps_live_windows() {
        let clock = MockClock::new(0);
        let registry = registry(&clock);
        let short = RateLimitConfig::new(5, 10).unwrap();
        let long = RateLimitConfig::new(5, 100).unwrap();

        registry.with_window("short", |e, now| e.register_attempt(now, &short));
        registry.with_window("long", |e, now| e.register_attempt(now, &long));

        clock.advance(Duration::from_secs(50));

        assert_eq!(registry.remove_expired(), 1);
        assert_eq!(registry.len(), 1);

        let mut keys = Vec::new();
        registry.for_each(|key, _| keys.push(key.clone()));
        assert_eq!(keys, vec!["long".to_string()]);
    }

    #[test]
    fn test_remove_expired_is_idempotent() {
        let clock = MockClock::new(0);
        let registry = registry(&clock);
        let config = RateLimitConfig::new(1, 1).unwrap();
        registry.with_window("k", |e, now| e.register_attempt(now, &config));

        clock.advance(Duration::from_secs(2));

        assert_eq!(registry.remove_expired(), 1);
        assert_eq!(registry.remove_expired(), 0);
        assert!(registry.is_empty());
    }
}
