//! Bounded insertion-order cache.
//!
//! Long-running processing would otherwise grow its memoization maps without
//! limit, so every cache in the pipeline is one of these: a fixed capacity
//! with oldest-first batch eviction on the insertion path. Reads never mutate.

use std::borrow::Borrow;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// A capacity-bounded map that evicts its oldest entries (by insertion order)
/// in batches of roughly 10% of capacity once full.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    capacity: usize,
    map: HashMap<K, V>,
    order: VecDeque<K>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            map: HashMap::with_capacity(capacity.min(1024)),
            order: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.get(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Insert a value, evicting the oldest entries first if the cache is full.
    ///
    /// Re-inserting an existing key updates the value in place and keeps the
    /// key's original position in the eviction order.
    pub fn insert(&mut self, key: K, value: V) {
        if let Some(slot) = self.map.get_mut(&key) {
            *slot = value;
            return;
        }
        if self.map.len() >= self.capacity {
            self.evict_oldest();
        }
        self.order.push_back(key.clone());
        self.map.insert(key, value);
    }

    fn evict_oldest(&mut self) {
        let batch = (self.capacity / 10).max(1);
        for _ in 0..batch {
            match self.order.pop_front() {
                Some(key) => {
                    self.map.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut cache = BoundedCache::new(10);
        assert!(cache.is_empty());
        cache.insert("a".to_string(), 1);
        assert_eq!(cache.get("a"), Some(&1));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_empty());
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut cache = BoundedCache::new(10);
        for i in 0..11u32 {
            cache.insert(i, i);
        }
        assert!(cache.len() <= 10);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut cache = BoundedCache::new(30);
        for i in 0..30u32 {
            cache.insert(i, i);
        }
        // 31st insert evicts 30/10 = 3 oldest entries.
        cache.insert(30, 30);
        assert!(!cache.contains(&0));
        assert!(!cache.contains(&1));
        assert!(!cache.contains(&2));
        assert!(cache.contains(&3));
        assert!(cache.contains(&30));
        assert_eq!(cache.len(), 28);
    }

    #[test]
    fn update_does_not_grow_or_reorder() {
        let mut cache = BoundedCache::new(10);
        for i in 0..10u32 {
            cache.insert(i, i);
        }
        cache.insert(0, 100);
        assert_eq!(cache.len(), 10);
        assert_eq!(cache.get(&0), Some(&100));
        // 0 kept its original slot, so it is still first in line for eviction.
        cache.insert(10, 10);
        assert!(!cache.contains(&0));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut cache = BoundedCache::new(0);
        cache.insert("a", 1);
        assert_eq!(cache.len(), 1);
        cache.insert("b", 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("b"));
    }
}
