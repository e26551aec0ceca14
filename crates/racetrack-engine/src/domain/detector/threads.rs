//! Thread lifecycle: fork, join, detach, finish and call stacks

use super::settings::Resource;
use super::{handle, FastTrack, Handle};
use crate::domain::policy::{LockPolicy, ShadowLock, ShadowMap};
use crate::domain::thread::{Lifecycle, ThreadState};
use racetrack_core::{ThreadId, UsageAnomaly};
use tracing::debug;

impl<P: LockPolicy> FastTrack<P> {
    /// Handle for `tid`, registering unknown threads as roots
    ///
    /// Events from retired threads, and new threads over the configured
    /// limit, are not tracked.
    pub(super) fn thread(&self, tid: ThreadId) -> Option<Handle<P, ThreadState>> {
        if let Some(thread) = self.threads.get(&tid) {
            return Some(thread);
        }
        if self.is_retired(tid) {
            debug!(%tid, "event from retired thread ignored");
            return None;
        }
        if !self.settings.admit(Resource::Threads, || self.threads.len()) {
            return None;
        }
        debug!(%tid, "registering unknown thread as root");
        Some(
            self.threads
                .get_or_insert_with(tid, || handle::<P, _>(ThreadState::root(tid))),
        )
    }

    fn is_retired(&self, tid: ThreadId) -> bool {
        self.retired.read(|retired| retired.contains(&tid))
    }

    fn retire(&self, tid: ThreadId) {
        self.threads.remove(&tid);
        self.retired.write(|retired| retired.insert(tid));
    }

    pub(super) fn on_fork(&self, parent: ThreadId, child: ThreadId) {
        if child == parent || self.threads.get(&child).is_some() || self.is_retired(child) {
            self.report_anomaly(UsageAnomaly::ThreadReused { parent, child });
            return;
        }
        let Some(forker) = self.thread(parent) else {
            self.stats.record_untracked();
            return;
        };
        if !self.settings.admit(Resource::Threads, || self.threads.len()) {
            self.stats.record_untracked();
            return;
        }

        let state = forker.write(|p| {
            let state = ThreadState::forked(child, p);
            p.tick();
            state
        });
        self.threads
            .get_or_insert_with(child, || handle::<P, _>(state));
        debug!(%parent, %child, "fork");
    }

    pub(super) fn on_join(&self, parent: ThreadId, child: ThreadId) {
        let Some(joined) = self.threads.get(&child).filter(|_| child != parent) else {
            self.report_anomaly(UsageAnomaly::UnknownThread { thread: child });
            return;
        };
        let (lifecycle, final_clock) = joined.read(|c| (c.lifecycle(), c.clock().clone()));
        if lifecycle == Lifecycle::Detached {
            self.report_anomaly(UsageAnomaly::JoinDetached { parent, child });
            return;
        }
        let Some(joiner) = self.thread(parent) else {
            self.stats.record_untracked();
            return;
        };

        joiner.write(|p| {
            p.observe(&final_clock);
            p.tick();
        });
        self.retire(child);
        debug!(%parent, %child, "join");
    }

    pub(super) fn on_detach(&self, by: ThreadId, tid: ThreadId) {
        match self.threads.get(&tid) {
            Some(thread) => {
                thread.write(ThreadState::detach);
                debug!(%by, %tid, "detach");
            }
            None => self.report_anomaly(UsageAnomaly::UnknownThread { thread: tid }),
        }
    }

    /// Exit without join: the identity retires, nothing is merged anywhere
    pub(super) fn on_finish(&self, by: ThreadId, tid: ThreadId) {
        if self.threads.get(&tid).is_none() {
            self.report_anomaly(UsageAnomaly::UnknownThread { thread: tid });
            return;
        }
        self.retire(tid);
        debug!(%by, %tid, "finish");
    }

    pub(super) fn on_func_enter(&self, tid: ThreadId, pc: usize) {
        match self.thread(tid) {
            Some(thread) => thread.write(|t| t.enter(pc)),
            None => self.stats.record_untracked(),
        }
    }

    pub(super) fn on_func_exit(&self, tid: ThreadId) {
        let Some(thread) = self.thread(tid) else {
            self.stats.record_untracked();
            return;
        };
        if thread.write(ThreadState::exit).is_none() {
            self.report_anomaly(UsageAnomaly::StackUnderflow { thread: tid });
        }
    }
}
