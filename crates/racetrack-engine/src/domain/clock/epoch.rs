//! Packed (thread, clock) epochs

use super::VectorClock;
use racetrack_core::ThreadId;
use std::fmt;

/// Scalar logical time of one thread
pub type Clock = u32;

/// A single point in one thread's logical time
///
/// # Representation
///
/// ```text
/// 63            32 31             0
/// ┌───────────────┬────────────────┐
/// │   thread id   │     clock      │
/// └───────────────┴────────────────┘
/// ```
///
/// Equality is a single integer compare, which is what the same-epoch fast
/// path relies on. Epochs of different threads carry no order by themselves.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Epoch(u64);

impl Epoch {
    /// Pack a thread id and clock
    #[inline]
    pub const fn new(tid: ThreadId, clock: Clock) -> Self {
        Self(((tid.as_u32() as u64) << 32) | clock as u64)
    }

    /// Owning thread
    #[inline]
    pub const fn tid(self) -> ThreadId {
        ThreadId::new((self.0 >> 32) as u32)
    }

    /// Clock component
    #[inline]
    pub const fn clock(self) -> Clock {
        self.0 as u32
    }

    /// Raw packed value
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Same thread, new clock
    #[inline]
    #[must_use]
    pub const fn with_clock(self, clock: Clock) -> Self {
        Self((self.0 & !0xFFFF_FFFF) | clock as u64)
    }

    /// Check if this epoch is ordered before the view `vc`
    ///
    /// True iff `vc` has observed at least this clock of the owning thread.
    #[inline]
    pub fn happens_before(self, vc: &VectorClock) -> bool {
        self.clock() <= vc.get(self.tid())
    }
}

impl fmt::Debug for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.clock(), self.tid())
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
