//! Detector counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live event counters
///
/// Relaxed atomics: counters are statistics, never used for synchronization.
#[derive(Debug, Default)]
pub struct DetectorStats {
    reads: AtomicU64,
    writes: AtomicU64,
    same_epoch: AtomicU64,
    races: AtomicU64,
    use_after_free: AtomicU64,
    anomalies: AtomicU64,
    untracked: AtomicU64,
    unmapped: AtomicU64,
}

/// Point-in-time copy of `DetectorStats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Read events processed
    pub reads: u64,
    /// Write events processed
    pub writes: u64,
    /// Accesses resolved by the same-epoch fast path
    pub same_epoch: u64,
    /// Races reported (all kinds)
    pub races: u64,
    /// Of which use-after-free races
    pub use_after_free: u64,
    /// Usage anomalies reported
    pub anomalies: u64,
    /// Events dropped because an entity could not be tracked
    pub untracked: u64,
    /// Accesses outside every mapped shadow region
    pub unmapped: u64,
}

macro_rules! counter {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            #[inline]
            pub(crate) fn $name(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl DetectorStats {
    /// Zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    counter! {
        record_read => reads,
        record_write => writes,
        record_same_epoch => same_epoch,
        record_race => races,
        record_use_after_free => use_after_free,
        record_anomaly => anomalies,
        record_untracked => untracked,
        record_unmapped => unmapped,
    }

    /// Copy the current values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            same_epoch: self.same_epoch.load(Ordering::Relaxed),
            races: self.races.load(Ordering::Relaxed),
            use_after_free: self.use_after_free.load(Ordering::Relaxed),
            anomalies: self.anomalies.load(Ordering::Relaxed),
            untracked: self.untracked.load(Ordering::Relaxed),
            unmapped: self.unmapped.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter
    pub fn reset(&self) {
        for counter in [
            &self.reads,
            &self.writes,
            &self.same_epoch,
            &self.races,
            &self.use_after_free,
            &self.anomalies,
            &self.untracked,
            &self.unmapped,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl StatsSnapshot {
    /// Total accesses processed
    pub const fn accesses(&self) -> u64 {
        self.reads + self.writes
    }
}
