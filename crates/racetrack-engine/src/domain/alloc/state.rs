//! One heap block

use crate::domain::clock::{Epoch, VectorClock};
use crate::domain::shadow::{Access, AccessHistory, AccessSite};
use racetrack_core::ThreadId;
use std::collections::{BTreeMap, HashSet};

/// A heap block, live or freed
#[derive(Debug, Clone)]
pub struct AllocationState {
    base: usize,
    size: usize,
    owner: ThreadId,
    pc: usize,
    dealloc: Option<Epoch>,
    reused: bool,
    stale: BTreeMap<usize, Access>,
    reported: HashSet<(ThreadId, usize)>,
}

impl AllocationState {
    /// Newly allocated block
    pub fn new(owner: ThreadId, pc: usize, base: usize, size: usize) -> Self {
        Self {
            base,
            size,
            owner,
            pc,
            dealloc: None,
            reused: false,
            stale: BTreeMap::new(),
            reported: HashSet::new(),
        }
    }

    /// First byte
    #[inline]
    pub const fn base(&self) -> usize {
        self.base
    }

    /// Size in bytes
    #[inline]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Allocating thread
    #[inline]
    pub const fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Epoch of the freeing thread at `free`, `None` while live
    #[inline]
    pub const fn dealloc(&self) -> Option<Epoch> {
        self.dealloc
    }

    /// Check if `addr` lies in the block
    #[inline]
    pub const fn contains(&self, addr: usize) -> bool {
        addr >= self.base && addr - self.base < self.size
    }

    /// Check if `[base, base + size)` intersects the block
    #[inline]
    pub const fn overlaps(&self, base: usize, size: usize) -> bool {
        base < self.base.saturating_add(self.size) && self.base < base.saturating_add(size)
    }

    /// Check if the block was freed
    #[inline]
    pub const fn is_freed(&self) -> bool {
        self.dealloc.is_some()
    }

    /// Check if the freed range has been handed out again
    #[inline]
    pub const fn is_reused(&self) -> bool {
        self.reused
    }

    pub(crate) fn free(&mut self, epoch: Epoch) {
        self.dealloc = Some(epoch);
    }

    pub(crate) fn mark_reused(&mut self) {
        self.reused = true;
    }

    pub(crate) fn stash(&mut self, addr: usize, access: Access) {
        self.stale.insert(addr, access);
    }

    /// Check if an access by `tid` with clock `vc` has not observed the free
    pub fn unordered_with(&self, tid: ThreadId, vc: &VectorClock) -> bool {
        self.owner != tid && self.dealloc.is_some_and(|e| !e.happens_before(vc))
    }

    /// Check if `(tid, addr)` was already reported against this block
    pub fn was_reported(&self, tid: ThreadId, addr: usize) -> bool {
        self.reported.contains(&(tid, addr))
    }

    pub(crate) fn mark_reported(&mut self, tid: ThreadId, addr: usize) -> bool {
        self.reported.insert((tid, addr))
    }

    /// Earlier access to report an access by `tid` at `addr` against,
    /// with the address it touched
    ///
    /// In order of preference:
    /// 1. the stale access kept at `addr` when the range was reused
    /// 2. before reuse, the access in `history` the freeing thread made up
    ///    to the free, else one made by another thread
    /// 3. a write of the whole block at the allocation site
    pub fn prior_access(
        &self,
        tid: ThreadId,
        addr: usize,
        history: Option<&AccessHistory>,
    ) -> (usize, Access) {
        if let Some(access) = self.stale.get(&addr) {
            return (addr, access.clone());
        }
        let recorded = history
            .filter(|_| !self.reused)
            .and_then(|h| self.blame(tid, h));
        if let Some(access) = recorded {
            return (addr, access.clone());
        }

        let clock = self.dealloc.map_or(0, Epoch::clock);
        let access = Access::new(
            Epoch::new(self.owner, clock),
            true,
            AccessSite::bare(self.pc, self.size),
        );
        (self.base, access)
    }

    fn blame<'h>(&self, tid: ThreadId, history: &'h AccessHistory) -> Option<&'h Access> {
        let freer = self.dealloc?;
        history
            .accesses()
            .find(|a| a.tid() == freer.tid() && a.epoch.clock() <= freer.clock())
            .or_else(|| history.accesses().find(|a| a.tid() != tid))
    }

    /// Number of stale accesses kept
    pub fn stale_len(&self) -> usize {
        self.stale.len()
    }
}
