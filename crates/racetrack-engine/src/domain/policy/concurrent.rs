//! Concurrent Policy - Maximum Performance
//!
//! # Design for Production
//!
//! - `DashMap` for sharded concurrent tables: threads touching different
//!   locations rarely contend on the same shard
//! - `parking_lot::RwLock` per location, lock object and thread
//!
//! No global lock is taken on the access path.

use super::{LockPolicy, ShadowLock, ShadowMap};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::hash::Hash;

/// Multi-threaded policy for live monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcurrentPolicy;

impl LockPolicy for ConcurrentPolicy {
    type Lock<T> = RwLock<T>;
    type Map<K: Eq + Hash + Copy, V: Clone> = DashMap<K, V>;

    const NAME: &'static str = "concurrent";
}

impl<T> ShadowLock<T> for RwLock<T> {
    #[inline]
    fn new(value: T) -> Self {
        Self::new(value)
    }

    #[inline]
    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&RwLock::read(self))
    }

    #[inline]
    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut RwLock::write(self))
    }
}

impl<K: Eq + Hash + Copy, V: Clone> ShadowMap<K, V> for DashMap<K, V> {
    #[inline]
    fn get(&self, key: &K) -> Option<V> {
        DashMap::get(self, key).map(|entry| entry.value().clone())
    }

    #[inline]
    fn get_or_insert_with(&self, key: K, make: impl FnOnce() -> V) -> V {
        self.entry(key).or_insert_with(make).value().clone()
    }

    fn remove(&self, key: &K) -> Option<V> {
        DashMap::remove(self, key).map(|(_, value)| value)
    }

    fn len(&self) -> usize {
        DashMap::len(self)
    }

    fn keys(&self) -> Vec<K> {
        self.iter().map(|entry| *entry.key()).collect()
    }

    fn values(&self) -> Vec<V> {
        self.iter().map(|entry| entry.value().clone()).collect()
    }

    fn clear(&self) {
        DashMap::clear(self);
    }
}
