//! Per-thread clock and lifecycle

use super::stack::CallStack;
use crate::domain::clock::{Clock, Epoch, VectorClock};
use racetrack_core::ThreadId;
use tracing::warn;

/// Lifecycle of a live thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Running and joinable
    Active,
    /// Running, will never be joined
    Detached,
}

/// State of one monitored thread
///
/// # Clock discipline
///
/// - Own component starts at 1, so no access is ever stamped with clock 0
/// - Plain reads and writes never advance the clock
/// - Every synchronization event the thread performs advances it by one
/// - The own component stops at `Clock::MAX`; from then on the thread's
///   epochs all compare equal and its repeat accesses take the same-epoch path
#[derive(Debug, Clone)]
pub struct ThreadState {
    tid: ThreadId,
    parent: Option<ThreadId>,
    vc: VectorClock,
    lifecycle: Lifecycle,
    stack: CallStack,
    saturated: bool,
}

impl ThreadState {
    /// Thread with no known parent (the main thread, or one first seen on an access)
    pub fn root(tid: ThreadId) -> Self {
        let mut vc = VectorClock::new();
        vc.increment(tid);
        Self {
            tid,
            parent: None,
            vc,
            lifecycle: Lifecycle::Active,
            stack: CallStack::new(),
            saturated: false,
        }
    }

    /// Child inheriting everything `parent` has observed
    ///
    /// The parent must be ticked by the caller afterwards so that its later
    /// events are not ordered before the child.
    pub fn forked(tid: ThreadId, parent: &Self) -> Self {
        let mut vc = parent.vc.clone();
        vc.increment(tid);
        Self {
            tid,
            parent: Some(parent.tid),
            vc,
            lifecycle: Lifecycle::Active,
            stack: CallStack::new(),
            saturated: false,
        }
    }

    /// Thread id
    #[inline]
    pub const fn tid(&self) -> ThreadId {
        self.tid
    }

    /// Forking thread, if any
    #[inline]
    pub const fn parent(&self) -> Option<ThreadId> {
        self.parent
    }

    /// Current vector clock
    #[inline]
    pub const fn clock(&self) -> &VectorClock {
        &self.vc
    }

    /// Current epoch (own tid, own component)
    #[inline]
    pub fn epoch(&self) -> Epoch {
        self.vc.epoch(self.tid)
    }

    /// Advance the own component after a synchronization event
    #[inline]
    pub fn tick(&mut self) {
        if self.vc.increment(self.tid) == Clock::MAX && !self.saturated {
            self.saturated = true;
            warn!(
                tid = %self.tid,
                "logical clock saturated, later epochs of this thread compare equal"
            );
        }
    }

    /// Check if the own component reached `Clock::MAX`
    #[inline]
    pub const fn is_saturated(&self) -> bool {
        self.saturated
    }

    /// Absorb a clock observed through synchronization
    #[inline]
    pub fn observe(&mut self, other: &VectorClock) {
        self.vc.join(other);
    }

    /// Current lifecycle
    #[inline]
    pub const fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Mark the thread unjoinable
    pub fn detach(&mut self) {
        self.lifecycle = Lifecycle::Detached;
    }

    /// Snapshot of the shadow call stack
    #[inline]
    pub fn stack(&self) -> CallStack {
        self.stack.clone()
    }

    /// Function entry
    pub fn enter(&mut self, pc: usize) {
        self.stack.push(pc);
    }

    /// Function exit; `None` when the stack was already empty
    pub fn exit(&mut self) -> Option<usize> {
        self.stack.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_starts_at_one() {
        let t = ThreadState::root(ThreadId::new(0));
        assert_eq!(t.epoch(), Epoch::new(ThreadId::new(0), 1));
        assert_eq!(t.parent(), None);
        assert_eq!(t.lifecycle(), Lifecycle::Active);
    }

    #[test]
    fn test_fork_inherits_parent_clock() {
        let mut parent = ThreadState::root(ThreadId::new(0));
        parent.tick();
        let child = ThreadState::forked(ThreadId::new(1), &parent);
        parent.tick();

        assert_eq!(child.clock().get(ThreadId::new(0)), 2);
        assert_eq!(child.clock().get(ThreadId::new(1)), 1);
        assert_eq!(child.parent(), Some(ThreadId::new(0)));
        // parent's later epoch is not visible to the child
        assert!(!parent.epoch().happens_before(child.clock()));
        // but everything before the fork is
        assert!(Epoch::new(ThreadId::new(0), 2).happens_before(child.clock()));
    }

    #[test]
    fn test_observe_and_tick() {
        let mut a = ThreadState::root(ThreadId::new(0));
        let b = ThreadState::root(ThreadId::new(1));
        a.observe(b.clock());
        a.tick();
        assert!(b.epoch().happens_before(a.clock()));
        assert_eq!(a.epoch().clock(), 2);
    }

    #[test]
    fn test_tick_saturates_once() {
        let tid = ThreadId::new(0);
        let mut t = ThreadState::root(tid);
        let high: VectorClock = [(tid, Clock::MAX - 1)].into_iter().collect();
        t.observe(&high);
        assert!(!t.is_saturated());

        t.tick();
        assert!(t.is_saturated());
        let before = t.epoch();
        t.tick();
        assert_eq!(t.epoch(), before, "no distinct epoch past the limit");
    }

    #[test]
    fn test_call_stack() {
        let mut t = ThreadState::root(ThreadId::new(0));
        t.enter(0x10);
        t.enter(0x20);
        let snap = t.stack();
        assert_eq!(t.exit(), Some(0x20));
        assert_eq!(snap.frames(4), vec![0x10, 0x20]);
        assert_eq!(t.exit(), Some(0x10));
        assert_eq!(t.exit(), None);
    }

    #[test]
    fn test_detach() {
        let mut t = ThreadState::root(ThreadId::new(3));
        t.detach();
        assert_eq!(t.lifecycle(), Lifecycle::Detached);
    }
}
