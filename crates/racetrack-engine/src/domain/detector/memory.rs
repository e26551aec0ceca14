//! Heap allocation events and shadow regions

use super::FastTrack;
use crate::domain::alloc::{pages, AllocationState, AllocationTable, FreeError};
use crate::domain::clock::VectorClock;
use crate::domain::policy::{LockPolicy, ShadowLock, ShadowMap};
use crate::domain::shadow::Access;
use racetrack_core::{ThreadId, UsageAnomaly};
use std::sync::atomic::Ordering;
use tracing::debug;

impl<P: LockPolicy> FastTrack<P> {
    pub(super) fn on_allocate(&self, tid: ThreadId, pc: usize, addr: usize, size: usize) {
        if !self.settings.track_allocations() || size == 0 {
            return;
        }

        self.allocations.write(|table| {
            let (reused, retired) = table.begin_reuse(addr, size);
            for (at, stale) in self.reset_range(addr, size) {
                if reused {
                    table.stash(at, stale);
                }
            }
            table.allocate(AllocationState::new(tid, pc, addr, size));
            self.release_pages(table, &retired);
        });
        debug!(%tid, addr, size, "allocate");
    }

    /// Drop the shadow state of `[addr, addr + size)`, returning the last
    /// access of every location that had one
    fn reset_range(&self, addr: usize, size: usize) -> Vec<(usize, Access)> {
        let end = addr.saturating_add(size);
        let keys: Vec<usize> = if size <= self.shadow.len() {
            (addr..end).collect()
        } else {
            self.shadow
                .keys()
                .into_iter()
                .filter(|k| (addr..end).contains(k))
                .collect()
        };

        keys.into_iter()
            .filter_map(|at| {
                let history = self.shadow.remove(&at)?;
                history.write(|h| h.reset()).map(|access| (at, access))
            })
            .collect()
    }

    pub(super) fn on_deallocate(&self, tid: ThreadId, addr: usize) {
        if !self.settings.track_allocations() {
            return;
        }
        let Some(thread) = self.thread(tid) else {
            self.stats.record_untracked();
            return;
        };

        let epoch = thread.read(|t| t.epoch());
        let freed = self.allocations.write(|table| {
            let freed = table.free(addr, epoch)?;
            let (base, size) = freed.block;
            for page in pages(base, size) {
                self.freed_pages.get_or_insert_with(page, || ());
            }
            self.release_pages(table, &freed.evicted);
            Ok(freed.sweep_due)
        });
        match freed {
            Ok(sweep_due) => {
                debug!(%tid, addr, %epoch, "deallocate");
                if sweep_due {
                    self.retire_observed();
                }
            }
            Err(FreeError::DoubleFree) => {
                self.report_anomaly(UsageAnomaly::DoubleFree { thread: tid, addr });
            }
            Err(FreeError::Unknown) => {
                self.report_anomaly(UsageAnomaly::UnknownAllocation { thread: tid, addr });
            }
        }
    }

    /// Drop the page marks of `blocks` that no retained freed block needs
    fn release_pages(&self, table: &AllocationTable, blocks: &[(usize, usize)]) {
        for &(base, size) in blocks {
            for page in pages(base, size) {
                if !table.covers_page(page) {
                    self.freed_pages.remove(&page);
                }
            }
        }
    }

    /// Retire freed blocks whose free every live thread has observed
    fn retire_observed(&self) {
        let floor = self
            .threads
            .values()
            .iter()
            .map(|t| t.read(|t| t.clock().clone()))
            .reduce(|mut floor, vc| {
                floor.meet(&vc);
                floor
            })
            .unwrap_or_else(VectorClock::new);

        self.allocations.write(|table| {
            let retired = table.retire_observed(&floor);
            if !retired.is_empty() {
                debug!(count = retired.len(), left = table.freed_len(), "retired observed frees");
            }
            self.release_pages(table, &retired);
        });
    }

    pub(super) fn on_map_shadow(&self, start: usize, size: usize) {
        self.regions.write(|regions| {
            let end = start.saturating_add(size);
            let merged_end = regions.get(&start).map_or(end, |&old| old.max(end));
            regions.insert(start, merged_end);
        });
        self.mapped.store(true, Ordering::Relaxed);
        debug!(start, size, "map shadow");
    }

    /// Check if `addr` lies outside every announced region
    ///
    /// Always false until the first `map_shadow`.
    pub(super) fn is_unmapped(&self, addr: usize) -> bool {
        if !self.mapped.load(Ordering::Relaxed) {
            return false;
        }
        self.regions
            .read(|regions| !regions.range(..=addr).rev().any(|(_, &end)| addr < end))
    }
}
