//! Lock clocks with recursion-aware holders

use crate::domain::clock::VectorClock;
use racetrack_core::ThreadId;

/// Result of a release request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Outermost release: the lock clock must absorb the releaser's clock
    Released,
    /// Inner release of a recursive acquisition
    Nested,
    /// Releasing thread does not hold the lock
    NotHeld,
}

/// State of one lock object
///
/// A lock may be held by several threads at once in read mode, so holders are
/// a small list of (thread, depth) pairs rather than a single owner.
#[derive(Debug, Clone, Default)]
pub struct LockState {
    clock: VectorClock,
    holders: Vec<(ThreadId, u32)>,
}

impl LockState {
    /// Unlocked, with an empty release clock
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an acquisition by `tid`
    ///
    /// Returns `true` for the outermost acquisition, after which the caller
    /// joins the thread's clock with `clock()`.
    pub fn acquire(&mut self, tid: ThreadId) -> bool {
        match self.holders.iter_mut().find(|(holder, _)| *holder == tid) {
            Some((_, depth)) => {
                *depth = depth.saturating_add(1);
                false
            }
            None => {
                self.holders.push((tid, 1));
                true
            }
        }
    }

    /// Record a release by `tid`
    ///
    /// `NotHeld` leaves the state untouched.
    pub fn release(&mut self, tid: ThreadId) -> ReleaseOutcome {
        let Some(idx) = self.holders.iter().position(|(holder, _)| *holder == tid) else {
            return ReleaseOutcome::NotHeld;
        };
        let depth = &mut self.holders[idx].1;
        *depth -= 1;
        if *depth == 0 {
            self.holders.swap_remove(idx);
            ReleaseOutcome::Released
        } else {
            ReleaseOutcome::Nested
        }
    }

    /// Fold the releasing thread's clock into the lock clock
    ///
    /// For an exclusively held lock this equals a copy, since the holder
    /// already joined the previous release clock. Concurrent read-mode holders
    /// must not overwrite each other, hence the join.
    pub fn absorb(&mut self, releaser: &VectorClock) {
        self.clock.join(releaser);
    }

    /// Clock published by past releases
    #[inline]
    pub const fn clock(&self) -> &VectorClock {
        &self.clock
    }

    /// Recursion depth of `tid` (0 when not held)
    pub fn depth(&self, tid: ThreadId) -> u32 {
        self.holders
            .iter()
            .find(|(holder, _)| *holder == tid)
            .map_or(0, |(_, depth)| *depth)
    }

    /// Check if any thread holds the lock
    #[inline]
    pub fn is_held(&self) -> bool {
        !self.holders.is_empty()
    }
}
