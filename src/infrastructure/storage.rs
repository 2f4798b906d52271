//! Sharded concurrent storage.
//!
//! Backs the bucket registry, the user set and the change log.

use crate::application::ports::Storage;
use ahash::RandomState;
use dashmap::DashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Thread-safe sharded storage backed by DashMap.
///
/// DashMap shards its entries across independently locked segments, so
/// accesses to unrelated keys rarely contend, while every access to a single
/// key is serialized by its shard lock. Keys are hashed with ahash.
#[derive(Debug)]
pub struct ShardedStorage<K, V>
where
    K: Eq + Hash,
{
    map: DashMap<K, V, RandomState>,
}

impl<K, V> ShardedStorage<K, V>
where
    K: Eq + Hash,
{
    /// Create a new sharded storage instance.
    pub fn new() -> Self {
        Self {
            map: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Create a storage instance with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: DashMap::with_capacity_and_hasher(capacity, RandomState::new()),
        }
    }
}

impl<K, V> Default for ShardedStorage<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Storage<K, V> for ShardedStorage<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + Debug,
    V: Send + Sync + Debug,
{
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        let entry = self.map.entry(key);
        let mut value_ref = entry.or_insert_with(factory);
        accessor(&mut value_ref)
    }

    fn with_entry<F, R>(&self, key: &K, accessor: F) -> Option<R>
    where
        F: FnOnce(&V) -> R,
    {
        self.map.get(key).map(|value_ref| accessor(value_ref.value()))
    }

    fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    fn insert(&self, key: K, value: V) -> Option<V> {
        self.map.insert(key, value)
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.map.remove(key).map(|(_, value)| value)
    }

    fn remove_if<F>(&self, key: &K, predicate: F) -> Option<V>
    where
        F: FnOnce(&V) -> bool,
    {
        self.map
            .remove_if(key, |_, value| predicate(value))
            .map(|(_, value)| value)
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

    #[test]
    fn test_basic_operations() {
        let storage: ShardedStorage<&str, i32> = ShardedStorage::new();

        assert_eq!(storage.insert("key1", 100), None);
        assert_eq!(storage.insert("key2", 200), None);

        assert_eq!(storage.with_entry(&"key1", |v| *v), Some(100));
        assert_eq!(storage.with_entry(&"key3", |v| *v), None);

        assert_eq!(storage.len(), 2);
        assert!(!storage.is_empty());
    }

    #[test]
    fn test_update() {
        let storage: ShardedStorage<&str, i32> = ShardedStorage::new();

        storage.insert("key", 100);
        assert_eq!(storage.insert("key", 200), Some(100));
        assert_eq!(storage.with_entry(&"key", |v| *v), Some(200));
    }

    #[test]
    fn test_remove() {
        let storage: ShardedStorage<&str, i32> = ShardedStorage::new();

        storage.insert("key", 100);
        assert!(storage.contains_key(&"key"));

        assert_eq!(storage.remove(&"key"), Some(100));
        assert!(!storage.contains_key(&"key"));
        assert_eq!(storage.remove(&"key"), None);
    }

    #[test]
    fn test_remove_if_checks_value() {
        let storage: ShardedStorage<&str, i32> = ShardedStorage::new();
        storage.insert("key", 100);

        assert_eq!(storage.remove_if(&"key", |v| *v == 0), None);
        assert!(storage.contains_key(&"key"));

        assert_eq!(storage.remove_if(&"key", |v| *v == 100), Some(100));
        assert!(!storage.contains_key(&"key"));
        assert_eq!(storage.remove_if(&"missing", |_| true), None);
    }

    #[test]
    fn test_with_entry_mut_creates_once() {
        let storage: ShardedStorage<&str, i32> = ShardedStorage::new();

        let first = storage.with_entry_mut("key", || 10, |v| {
            *v += 1;
            *v
        });
        let second = storage.with_entry_mut("key", || 10, |v| {
            *v += 1;
            *v
        });

        assert_eq!(first, 11);
        assert_eq!(second, 12);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_retain_and_clear() {
        let storage: ShardedStorage<i32, i32> = ShardedStorage::with_capacity(16);
        for i in 0..10 {
            storage.insert(i, i * 10);
        }

        storage.retain(|k, _| k % 2 == 0);
        assert_eq!(storage.len(), 5);

        let mut sum = 0;
        storage.for_each(|_, v| sum += *v);
        assert_eq!(sum, 200);

        storage.clear();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let storage: Arc<ShardedStorage<String, usize>> = Arc::new(ShardedStorage::new());
        let mut handles = vec![];

        for i in 0..10 {
            let storage_clone = Arc::clone(&storage);
            let handle = thread::spawn(move || {
                for j in 0..100 {
                    storage_clone.insert(format!("key_{}_{}", i, j), i * 100 + j);
                }
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(storage.len(), 1000);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        use std::thread;

        let storage: Arc<ShardedStorage<&str, u64>> = Arc::new(ShardedStorage::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let storage_clone = Arc::clone(&storage);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    storage_clone.with_entry_mut("counter", || 0, |v| *v += 1);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(storage.with_entry(&"counter", |v| *v), Some(8000));
    }
}
