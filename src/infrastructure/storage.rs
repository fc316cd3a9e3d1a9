//! Storage implementations for limiter state.
//!
//! Provides concurrent, sharded storage for tracking attempt windows.

use crate::application::ports::Storage;
use ahash::RandomState;
use dashmap::DashMap;
use std::hash::Hash;

/// Concurrent map split into independently locked shards.
///
/// An entry guard holds its shard's write lock, which is what makes
/// `with_entry_mut` atomic per key across OS threads.
#[derive(Debug)]
pub struct ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    map: DashMap<K, V, RandomState>,
}

impl<K, V> ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty storage.
    pub fn new() -> Self {
        Self {
            map: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Create an empty storage sized for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: DashMap::with_capacity_and_hasher(capacity, RandomState::new()),
        }
    }

    /// Insert a value, replacing any previous one.
    pub fn insert(&self, key: K, value: V) {
        self.map.insert(key, value);
    }

    /// Get a copy of a value.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    /// Whether `key` is present, expired or not.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }
}

impl<K, V> Default for ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Storage<K, V> for ShardedStorage<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + std::fmt::Debug,
    V: Send + Sync + std::fmt::Debug,
{
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        let entry = self.map.entry(key);
        let mut value_ref = entry.or_insert_with(factory);
        accessor(&mut value_ref)
    }

    fn remove(&self, key: &K) -> bool {
        self.map.remove(key).is_some()
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn clear(&self) {
        self.map.clear()
    }

    fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        for entry in self.map.iter() {
            f(entry.key(), entry.value());
        }
    }

    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.map.retain(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_with_entry_mut_creates_then_updates() {
        let storage: ShardedStorage<String, u32> = ShardedStorage::new();

        let first = storage.with_entry_mut("k".to_string(), || 0, |v| {
            *v += 1;
            *v
        });
        let second = storage.with_entry_mut("k".to_string(), || 100, |v| {
            *v += 1;
            *v
        });

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(storage.get("k"), Some(2));
    }

    #[test]
    fn test_remove_and_clear() {
        let storage: ShardedStorage<String, u32> = ShardedStorage::new();
        storage.insert("a".to_string(), 1);
        storage.insert("b".to_string(), 2);

        assert!(Storage::remove(&storage, &"a".to_string()));
        assert!(!Storage::remove(&storage, &"a".to_string()));
        assert!(!storage.contains_key("a"));
        assert_eq!(Storage::len(&storage), 1);

        Storage::clear(&storage);
        assert!(Storage::is_empty(&storage));
    }

    #[test]
    fn test_retain() {
        let storage: ShardedStorage<String, u32> = ShardedStorage::new();
        for i in 0..10 {
            storage.insert(format!("key_{i}"), i);
        }

        storage.retain(|_, v| *v % 2 == 0);

        assert_eq!(Storage::len(&storage), 5);
        let mut seen = 0;
        storage.for_each(|_, v| {
            assert_eq!(v % 2, 0);
            seen += 1;
        });
        assert_eq!(seen, 5);
    }

    #[test]
    fn test_concurrent_access() {
        let storage: Arc<ShardedStorage<String, u64>> = Arc::new(ShardedStorage::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let storage_clone = Arc::clone(&storage);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    storage_clone.with_entry_mut("shared".to_string(), || 0, |v| *v += 1);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(storage.get("shared"), Some(1000));
    }

    #[test]
    fn test_shared_through_arc() {
        let storage = Arc::new(ShardedStorage::<String, u32>::with_capacity(16));
        let alias = Arc::clone(&storage);

        alias.with_entry_mut("k".to_string(), || 7, |_| ());

        assert_eq!(Storage::len(&storage), 1);
        assert!(Storage::remove(&storage, &"k".to_string()));
        assert!(Storage::is_empty(&alias));
    }
}
