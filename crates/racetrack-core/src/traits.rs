//! # Behavior Contracts
//!
//! The capability set every race-detection backend implements. The host
//! forwards one event at a time; every event returns nothing and may trigger
//! at most one race report through the callback registered at `init`.

use crate::abi::Race;
use crate::context::{ThreadContext, ThreadId};
use crate::error::UsageAnomaly;
use std::sync::Arc;

/// Race delivery callback registered at `init`
pub type RaceCallback = Arc<dyn Fn(&Race) + Send + Sync>;

/// Optional sink for usage anomalies
pub type AnomalyCallback = Arc<dyn Fn(&UsageAnomaly) + Send + Sync>;

/// Race detector capability contract
///
/// All methods take `&self`: backends synchronize internally according to
/// their locking policy. Whether a backend may be shared across threads is
/// expressed by its `Send`/`Sync` bounds, not by this trait.
///
/// # Event protocol
///
/// ```text
/// init ─▶ fork/join/detach/finish
///         acquire/release, happens_before/after
///         read/write, allocate/deallocate
///         func_enter/func_exit, map_shadow
///      ─▶ finalize ─▶ (init again)
/// ```
pub trait Detector {
    /// Initialize the backend
    ///
    /// Returns `false` when the arguments cannot be parsed.
    fn init(&self, args: &[&str], callback: RaceCallback) -> bool;

    /// Tear down all state
    ///
    /// Idempotent; a later `init` starts a fresh session.
    fn finalize(&self);

    /// Announce an application memory region
    fn map_shadow(&self, start: usize, size: usize);

    /// Memory read
    fn read(&self, ctx: ThreadContext, pc: usize, addr: usize, size: usize);

    /// Memory write
    fn write(&self, ctx: ThreadContext, pc: usize, addr: usize, size: usize);

    /// Heap allocation of `[addr, addr + size)`
    fn allocate(&self, ctx: ThreadContext, pc: usize, addr: usize, size: usize);

    /// Heap deallocation of the block starting at `addr`
    fn deallocate(&self, ctx: ThreadContext, addr: usize);

    /// Lock acquisition (after the lock was obtained)
    fn acquire(&self, ctx: ThreadContext, lock: usize, recursive: bool, is_write: bool);

    /// Lock release (before the lock is given up)
    fn release(&self, ctx: ThreadContext, lock: usize, is_write: bool);

    /// Source side of an explicit synchronization edge
    fn happens_before(&self, ctx: ThreadContext, id: usize);

    /// Sink side of an explicit synchronization edge
    fn happens_after(&self, ctx: ThreadContext, id: usize);

    /// Thread creation; returns the child's handle
    fn fork(&self, parent: ThreadContext, child: ThreadId) -> ThreadContext;

    /// Parent waits for the child's termination
    fn join(&self, parent: ThreadContext, child: ThreadId);

    /// Child becomes unjoinable
    fn detach(&self, ctx: ThreadContext, tid: ThreadId);

    /// Exit of a thread that will not be joined
    fn finish(&self, ctx: ThreadContext, tid: ThreadId);

    /// Function entry, for call-stack capture
    fn func_enter(&self, ctx: ThreadContext, pc: usize);

    /// Function exit
    fn func_exit(&self, ctx: ThreadContext);

    /// Backend name
    fn name(&self) -> &'static str;

    /// Backend version
    fn version(&self) -> &'static str;
}
