//! Replay Policy - Single-threaded
//!
//! Offline trace replay runs on one thread, so locking degenerates to
//! `RefCell` borrow flags. The policy's types are `!Sync`; a detector built
//! on it cannot be shared across threads.

use super::{LockPolicy, ShadowLock, ShadowMap};
use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;

/// Single-threaded policy for replaying captured traces
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayPolicy;

impl LockPolicy for ReplayPolicy {
    type Lock<T> = RefCell<T>;
    type Map<K: Eq + Hash + Copy, V: Clone> = RefCell<HashMap<K, V>>;

    const NAME: &'static str = "replay";
}

impl<T> ShadowLock<T> for RefCell<T> {
    #[inline]
    fn new(value: T) -> Self {
        Self::new(value)
    }

    #[inline]
    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.borrow())
    }

    #[inline]
    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.borrow_mut())
    }
}

impl<K: Eq + Hash + Copy, V: Clone> ShadowMap<K, V> for RefCell<HashMap<K, V>> {
    #[inline]
    fn get(&self, key: &K) -> Option<V> {
        self.borrow().get(key).cloned()
    }

    #[inline]
    fn get_or_insert_with(&self, key: K, make: impl FnOnce() -> V) -> V {
        self.borrow_mut().entry(key).or_insert_with(make).clone()
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.borrow_mut().remove(key)
    }

    fn len(&self) -> usize {
        self.borrow().len()
    }

    fn keys(&self) -> Vec<K> {
        self.borrow().keys().copied().collect()
    }

    fn values(&self) -> Vec<V> {
        self.borrow().values().cloned().collect()
    }

    fn clear(&self) {
        self.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    type Table = <ReplayPolicy as LockPolicy>::Map<u32, Arc<RefCell<Vec<u32>>>>;

    #[test]
    fn test_handles_alias_one_cell() {
        let table = Table::default();
        let a = table.get_or_insert_with(7, || Arc::new(RefCell::new(Vec::new())));
        ShadowLock::write(&*a, |v| v.push(1));
        let b = ShadowMap::get(&table, &7).expect("inserted");
        assert_eq!(ShadowLock::read(&*b, Vec::len), 1);
    }

    #[test]
    fn test_remove() {
        let table = Table::default();
        table.get_or_insert_with(1, || Arc::new(RefCell::new(vec![1])));
        assert_eq!(ShadowMap::len(&table), 1);
        assert!(ShadowMap::remove(&table, &1).is_some());
        assert!(ShadowMap::is_empty(&table));
    }
}
