//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::domain::cart::Product;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use thiserror::Error;

/// Port for obtaining current time.
///
/// This abstraction allows the application layer to work with time
/// without depending on system clock implementation details.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// Port for concurrent key-value storage of limiter state.
///
/// This abstraction allows the application layer to store and retrieve values
/// without depending on specific concurrent data structure implementations.
/// Infrastructure provides concrete implementations (ShardedStorage); an
/// `Arc` of any storage is itself a storage sharing the same entries.
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Access an entry with mutable access, creating it if necessary.
    ///
    /// The factory and the accessor run while the entry is exclusively
    /// held, so a read-check-write inside `accessor` is atomic per key.
    ///
    /// # Arguments
    /// * `key` - The key to look up
    /// * `factory` - Function to create a new value if the key doesn't exist
    /// * `accessor` - Function that gets mutable access to the value
    ///
    /// # Returns
    /// The result from the accessor function
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R;

    /// Remove an entry, returning whether it existed.
    fn remove(&self, key: &K) -> bool;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Clear all entries from the storage.
    fn clear(&self);

    /// Iterate over all entries, providing access to both key and value.
    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V);

    /// Remove entries for which the predicate returns false.
    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool;
}

impl<K, V, T> Storage<K, V> for Arc<T>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
    T: Storage<K, V>,
{
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        T::with_entry_mut(self, key, factory, accessor)
    }

    fn remove(&self, key: &K) -> bool {
        T::remove(self, key)
    }

    fn len(&self) -> usize {
        T::len(self)
    }

    fn is_empty(&self) -> bool {
        T::is_empty(self)
    }

    fn clear(&self) {
        T::clear(self)
    }

    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V),
    {
        T::for_each(self, f)
    }

    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        T::retain(self, f)
    }
}

/// Error raised by a [`KeyValueStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failed
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Value could not be encoded or decoded
    #[error("storage serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Key is not usable by this store
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    /// Store refused the operation
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Port for durable local key-value storage.
pub trait KeyValueStore: Send + Sync + Debug {
    /// Read a value, `Ok(None)` if the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Where a transient notification is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    TopLeft,
    TopCenter,
    TopRight,
    BottomLeft,
    BottomCenter,
    #[default]
    BottomRight,
}

impl Placement {
    /// Kebab-case name, as used by toast libraries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Placement::TopLeft => "top-left",
            Placement::TopCenter => "top-center",
            Placement::TopRight => "top-right",
            Placement::BottomLeft => "bottom-left",
            Placement::BottomCenter => "bottom-center",
            Placement::BottomRight => "bottom-right",
        }
    }
}

/// Port for transient user-facing feedback. Fire-and-forget.
pub trait Notifier: Send + Sync + Debug {
    /// Show `message` at `placement`.
    fn notify(&self, message: &str, placement: Placement);
}

/// Port for product lookup.
pub trait ProductCatalog: Send + Sync + Debug {
    /// Snapshot of the product with this id, if any.
    fn product(&self, id: &str) -> Option<Product>;
}

/// Port for reading request headers (proxy chain).
pub trait HeaderSource {
    /// Value of the named header. Names are matched case-insensitively.
    fn header(&self, name: &str) -> Option<&str>;
}
