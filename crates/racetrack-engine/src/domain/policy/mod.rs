//! Locking Policy - The Zero-cost Razor
//!
//! # Design Philosophy
//!
//! The detector is generic over how its tables are synchronized. The policy
//! is a type parameter, so the choice is made at construction and every lock
//! call is monomorphized away; there is no runtime branch on the hot path.
//!
//! ```text
//! FastTrack<ConcurrentPolicy>             FastTrack<ReplayPolicy>
//!   ├─ DashMap<K, Arc<RwLock<T>>>           ├─ RefCell<HashMap<K, Arc<RefCell<T>>>>
//!   └─ Send + Sync, per-entity locks        └─ !Sync, borrow checks only
//! ```
//!
//! `ReplayPolicy` makes the detector `!Sync`, so using a replay engine from
//! more than one thread is rejected by the compiler.
//!
//! # Lock order
//!
//! Location (or lock object) before thread. No path holds two thread locks
//! or two location locks at once.

pub mod concurrent;
pub mod replay;

use std::hash::Hash;

pub use concurrent::ConcurrentPolicy;
pub use replay::ReplayPolicy;

/// Interior mutability for one shadow entity
pub trait ShadowLock<T> {
    /// Wrap a value
    fn new(value: T) -> Self;

    /// Run `f` with shared access
    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R;

    /// Run `f` with exclusive access
    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R;
}

/// Keyed table of entity handles
///
/// Values are cheap handles (`Arc`s) that are cloned out so that the table
/// itself is never locked while an entity is being updated.
pub trait ShadowMap<K, V>: Default {
    /// Handle for `key`
    fn get(&self, key: &K) -> Option<V>;

    /// Handle for `key`, inserting `make()` if absent
    fn get_or_insert_with(&self, key: K, make: impl FnOnce() -> V) -> V;

    /// Remove and return the handle for `key`
    fn remove(&self, key: &K) -> Option<V>;

    /// Number of entries
    fn len(&self) -> usize;

    /// Check if empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all keys
    fn keys(&self) -> Vec<K>;

    /// Snapshot of all handles
    fn values(&self) -> Vec<V>;

    /// Drop every entry
    fn clear(&self);
}

/// Synchronization strategy for the detector's tables
pub trait LockPolicy: 'static {
    /// Per-entity lock
    type Lock<T>: ShadowLock<T>;

    /// Keyed table
    type Map<K: Eq + Hash + Copy, V: Clone>: ShadowMap<K, V>;

    /// Policy name for logs
    const NAME: &'static str;
}
