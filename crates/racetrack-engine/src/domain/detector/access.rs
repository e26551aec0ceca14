//! The hot path: reads and writes
//!
//! ```text
//! access(t, addr)
//!   ├─ freed page filter      no freed block on the page → skip the table
//!   ├─ reuse boundary check   freed block at addr, free not observed by t?
//!   │                          → use-after-free race (once per t, addr)
//!   └─ history check           AccessHistory::read / write
//!                              → reported unless the boundary check already
//!                                reported this access
//! ```

use super::settings::Resource;
use super::{handle, FastTrack, Handle};
use crate::domain::alloc::{StaleHit, PAGE_SHIFT};
use crate::domain::policy::{LockPolicy, ShadowLock, ShadowMap};
use crate::domain::shadow::{Access, AccessHistory, AccessOutcome, AccessSite};
use crate::domain::thread::ThreadState;
use racetrack_core::ThreadId;
use tracing::trace;

impl<P: LockPolicy> FastTrack<P> {
    fn location(&self, addr: usize) -> Option<Handle<P, AccessHistory>> {
        if let Some(history) = self.shadow.get(&addr) {
            return Some(history);
        }
        if !self.settings.admit(Resource::Locations, || self.shadow.len()) {
            return None;
        }
        Some(
            self.shadow
                .get_or_insert_with(addr, || handle::<P, _>(AccessHistory::new())),
        )
    }

    pub(super) fn on_access(&self, tid: ThreadId, pc: usize, addr: usize, size: usize, write: bool) {
        if write {
            self.stats.record_write();
        } else {
            self.stats.record_read();
        }
        if self.is_unmapped(addr) {
            self.stats.record_unmapped();
        }

        let Some(thread) = self.thread(tid) else {
            self.stats.record_untracked();
            return;
        };

        let stale = self.check_reuse(&thread, tid, addr);

        let Some(history) = self.location(addr) else {
            self.stats.record_untracked();
            if let Some(hit) = stale {
                let current = thread.read(|t| current_access(t, pc, size, write));
                self.report_stale(addr, &hit, &current);
            }
            return;
        };

        let (outcome, current) = history.write(|h| {
            thread.read(|t| {
                let current = current_access(t, pc, size, write);
                let site = current.site.clone();
                let outcome = if write {
                    h.write(tid, t.clock(), site)
                } else {
                    h.read(tid, t.clock(), site)
                };
                (outcome, current)
            })
        });

        if let Some(hit) = stale {
            self.report_stale(addr, &hit, &current);
            return;
        }
        match outcome {
            AccessOutcome::SameEpoch => self.stats.record_same_epoch(),
            AccessOutcome::Ordered => {}
            AccessOutcome::Race(conflict) => self.report_conflict(addr, &conflict, &current),
        }
        trace!(%tid, pc, addr, write, "access");
    }

    /// Boundary check against freed blocks covering `addr`
    ///
    /// Addresses on pages without a freed block never touch the allocation
    /// table. Otherwise the table is checked under the shared lock first;
    /// only a hit takes the exclusive lock to record that it was reported.
    fn check_reuse(
        &self,
        thread: &Handle<P, ThreadState>,
        tid: ThreadId,
        addr: usize,
    ) -> Option<StaleHit> {
        if !self.settings.track_allocations()
            || self.freed_pages.get(&(addr >> PAGE_SHIFT)).is_none()
        {
            return None;
        }
        let candidate = self.allocations.read(|table| {
            !table.graveyard_is_empty()
                && thread.read(|t| table.has_stale_hit(tid, addr, t.clock()))
        });
        if !candidate {
            return None;
        }

        let location = self.shadow.get(&addr);
        self.allocations.write(|table| match &location {
            Some(history) => history.read(|h| {
                thread.read(|t| table.claim(tid, addr, t.clock(), Some(h)))
            }),
            None => thread.read(|t| table.claim(tid, addr, t.clock(), None)),
        })
    }
}

fn current_access(thread: &ThreadState, pc: usize, size: usize, write: bool) -> Access {
    Access::new(
        thread.epoch(),
        write,
        AccessSite {
            pc,
            size,
            stack: thread.stack(),
        },
    )
}
