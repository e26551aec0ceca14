//! Lock acquire/release and explicit happens-before signals

use super::settings::Resource;
use super::{handle, FastTrack, Handle};
use crate::domain::clock::VectorClock;
use crate::domain::lock::{LockState, ReleaseOutcome};
use crate::domain::policy::{LockPolicy, ShadowLock, ShadowMap};
use racetrack_core::{ThreadId, UsageAnomaly};
use tracing::trace;

impl<P: LockPolicy> FastTrack<P> {
    fn lock_object(&self, id: usize) -> Option<Handle<P, LockState>> {
        if let Some(lock) = self.locks.get(&id) {
            return Some(lock);
        }
        if !self.settings.admit(Resource::Locks, || self.locks.len() + self.signals.len()) {
            return None;
        }
        Some(self.locks.get_or_insert_with(id, || handle::<P, _>(LockState::new())))
    }

    fn signal(&self, id: usize) -> Option<Handle<P, VectorClock>> {
        if let Some(signal) = self.signals.get(&id) {
            return Some(signal);
        }
        if !self.settings.admit(Resource::Locks, || self.locks.len() + self.signals.len()) {
            return None;
        }
        Some(self.signals.get_or_insert_with(id, || handle::<P, _>(VectorClock::new())))
    }

    /// `recursive` is informational: re-acquisition by a holder is always
    /// treated as nesting.
    pub(super) fn on_acquire(&self, tid: ThreadId, id: usize, recursive: bool, is_write: bool) {
        let (Some(thread), Some(lock)) = (self.thread(tid), self.lock_object(id)) else {
            self.stats.record_untracked();
            return;
        };

        lock.write(|l| {
            if l.acquire(tid) {
                thread.write(|t| {
                    t.observe(l.clock());
                    t.tick();
                });
            }
            trace!(%tid, lock = id, recursive, is_write, depth = l.depth(tid), "acquire");
        });
    }

    pub(super) fn on_release(&self, tid: ThreadId, id: usize, is_write: bool) {
        let Some(thread) = self.thread(tid) else {
            self.stats.record_untracked();
            return;
        };
        let outcome = match self.locks.get(&id) {
            Some(lock) => lock.write(|l| {
                let outcome = l.release(tid);
                if outcome == ReleaseOutcome::Released {
                    thread.write(|t| {
                        l.absorb(t.clock());
                        t.tick();
                    });
                }
                outcome
            }),
            None => ReleaseOutcome::NotHeld,
        };

        if outcome == ReleaseOutcome::NotHeld {
            self.report_anomaly(UsageAnomaly::ReleaseWithoutAcquire { thread: tid, lock: id });
        } else {
            trace!(%tid, lock = id, is_write, ?outcome, "release");
        }
    }

    pub(super) fn on_happens_before(&self, tid: ThreadId, id: usize) {
        let (Some(thread), Some(signal)) = (self.thread(tid), self.signal(id)) else {
            self.stats.record_untracked();
            return;
        };
        signal.write(|s| {
            thread.write(|t| {
                s.join(t.clock());
                t.tick();
            });
        });
        trace!(%tid, id, "happens-before");
    }

    /// A happens-after may arrive before its happens-before; it then observes
    /// an empty clock.
    pub(super) fn on_happens_after(&self, tid: ThreadId, id: usize) {
        let (Some(thread), Some(signal)) = (self.thread(tid), self.signal(id)) else {
            self.stats.record_untracked();
            return;
        };
        signal.read(|s| thread.write(|t| t.observe(s)));
        trace!(%tid, id, "happens-after");
    }
}
