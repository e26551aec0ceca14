//! Race and anomaly delivery

use super::{lock, FastTrack};
use crate::domain::alloc::StaleHit;
use crate::domain::policy::{LockPolicy, ShadowLock};
use crate::domain::shadow::{Access, Conflict};
use racetrack_core::{AccessEntry, AnomalyCallback, Race, RaceCallback, RaceKind, UsageAnomaly};
use tracing::{debug, warn};

/// Registered callbacks
///
/// Callbacks are cloned out before being invoked, so a callback may call
/// back into the detector.
pub(crate) struct Reporter<P: LockPolicy> {
    on_race: P::Lock<Option<RaceCallback>>,
    on_anomaly: P::Lock<Option<AnomalyCallback>>,
}

impl<P: LockPolicy> Reporter<P> {
    pub(crate) fn new() -> Self {
        Self {
            on_race: lock::<P, _>(None),
            on_anomaly: lock::<P, _>(None),
        }
    }

    pub(crate) fn set_race(&self, callback: Option<RaceCallback>) {
        self.on_race.write(|slot| *slot = callback);
    }

    pub(crate) fn set_anomaly(&self, callback: Option<AnomalyCallback>) {
        self.on_anomaly.write(|slot| *slot = callback);
    }

    fn race(&self, race: &Race) {
        match self.on_race.read(Clone::clone) {
            Some(callback) => callback(race),
            None => debug!(%race, "race found with no callback registered"),
        }
    }

    fn anomaly(&self, anomaly: &UsageAnomaly) {
        if let Some(callback) = self.on_anomaly.read(Clone::clone) {
            callback(anomaly);
        }
    }
}

impl<P: LockPolicy> FastTrack<P> {
    /// Heap block containing `addr`, when allocation tracking is on
    fn heap_block(&self, addr: usize) -> Option<(usize, usize)> {
        if !self.settings.track_allocations() {
            return None;
        }
        self.allocations.read(|table| table.block_of(addr))
    }

    fn entry(&self, access: &Access, addr: usize, block: Option<(usize, usize)>) -> AccessEntry {
        let entry = access.to_entry(addr, self.settings.stack_depth());
        match block {
            Some((base, size)) => entry.with_heap_block(base, size),
            None => entry,
        }
    }

    /// Report a conflict found in a location's access history
    pub(super) fn report_conflict(&self, addr: usize, conflict: &Conflict, current: &Access) {
        let block = self.heap_block(addr);
        let race = Race::new(
            conflict.kind,
            self.entry(&conflict.prior, addr, block),
            self.entry(current, addr, block),
        );
        self.deliver(&race);
    }

    /// Report an access that did not observe the free of a reused block
    pub(super) fn report_stale(&self, addr: usize, hit: &StaleHit, current: &Access) {
        let race = Race::new(
            RaceKind::UseAfterFree,
            self.entry(&hit.prior, hit.addr, Some(hit.block)),
            self.entry(current, addr, self.heap_block(addr)),
        );
        self.stats.record_use_after_free();
        self.deliver(&race);
    }

    fn deliver(&self, race: &Race) {
        self.stats.record_race();
        debug!(
            kind = %race.kind,
            first = race.first.thread_id,
            second = race.second.thread_id,
            addr = race.second.accessed_memory,
            "race detected"
        );
        self.reporter.race(race);
    }

    /// Log, count and forward a usage anomaly
    pub(super) fn report_anomaly(&self, anomaly: UsageAnomaly) {
        self.stats.record_anomaly();
        warn!(%anomaly, "usage anomaly");
        self.reporter.anomaly(&anomaly);
    }
}
