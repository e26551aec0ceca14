//! The per-location read/write check
//!
//! # Algorithm
//!
//! For an access by thread `t` with clock `C` and epoch `e = C[t]@t`:
//!
//! ```text
//! write:  W == e                        → same epoch, done
//!         W ⋠ C                         → write/write race
//!         some reader r ⋠ C             → read/write race
//!         W := e, R := none
//!
//! read:   R holds e for t               → same epoch, done
//!         W ⋠ C                         → write/read race
//!         R none                        → R := exclusive(e)
//!         R exclusive, same thread      → R := exclusive(e)
//!         R exclusive, other thread     → R := shared{r, e}
//!         R shared                      → R[t] := e
//! ```
//!
//! Checks always ask whether the stored access happens before the new one.
//! State is updated even when a race is found.

use super::site::{Access, AccessSite};
use crate::domain::clock::{Epoch, VectorClock};
use racetrack_core::{RaceKind, ThreadId};

/// Readers since the last write
#[derive(Debug, Clone, Default)]
pub enum ReadState {
    /// No read since the last write
    #[default]
    None,
    /// A single reader
    Exclusive(Access),
    /// Several readers, one access per thread, sorted by thread id
    Shared(Vec<Access>),
}

impl ReadState {
    fn epoch_of(&self, tid: ThreadId) -> Option<Epoch> {
        match self {
            Self::None => None,
            Self::Exclusive(r) => (r.tid() == tid).then_some(r.epoch),
            Self::Shared(rs) => rs
                .binary_search_by(|r| r.tid().cmp(&tid))
                .ok()
                .map(|idx| rs[idx].epoch),
        }
    }

    /// Reader clock, materialized
    pub fn clock(&self) -> VectorClock {
        match self {
            Self::None => VectorClock::new(),
            Self::Exclusive(r) => [(r.tid(), r.epoch.clock())].into_iter().collect(),
            Self::Shared(rs) => rs.iter().map(|r| (r.tid(), r.epoch.clock())).collect(),
        }
    }

    /// Check if the readers are kept as a full clock
    pub const fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }
}

/// Earlier access found unordered with the current one
#[derive(Debug, Clone)]
pub struct Conflict {
    /// Kind of conflict
    pub kind: RaceKind,
    /// The earlier access
    pub prior: Access,
}

/// Result of checking one access
#[derive(Debug, Clone)]
pub enum AccessOutcome {
    /// Repeat within the same epoch; nothing checked or changed
    SameEpoch,
    /// Every stored access is ordered before this one
    Ordered,
    /// At most one conflict per access
    Race(Conflict),
}

impl AccessOutcome {
    /// Conflict, if any
    pub fn conflict(self) -> Option<Conflict> {
        match self {
            Self::Race(conflict) => Some(conflict),
            Self::SameEpoch | Self::Ordered => None,
        }
    }
}

/// Access history of one memory location
#[derive(Debug, Clone, Default)]
pub struct AccessHistory {
    write: Option<Access>,
    reads: ReadState,
}

impl AccessHistory {
    /// Untracked location
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write
    pub const fn last_write(&self) -> Option<&Access> {
        self.write.as_ref()
    }

    /// Readers since the last write
    pub const fn reads(&self) -> &ReadState {
        &self.reads
    }

    /// Stored accesses: the last write, then the readers
    pub fn accesses(&self) -> impl Iterator<Item = &Access> + '_ {
        let readers: &[Access] = match &self.reads {
            ReadState::None => &[],
            ReadState::Exclusive(r) => std::slice::from_ref(r),
            ReadState::Shared(rs) => rs,
        };
        self.write.iter().chain(readers)
    }

    /// Process a read by `tid` with clock `vc`
    pub fn read(&mut self, tid: ThreadId, vc: &VectorClock, site: AccessSite) -> AccessOutcome {
        let epoch = vc.epoch(tid);
        if self.reads.epoch_of(tid) == Some(epoch) {
            return AccessOutcome::SameEpoch;
        }

        let conflict = self
            .write
            .as_ref()
            .filter(|w| !w.epoch.happens_before(vc))
            .map(|w| Conflict {
                kind: RaceKind::WriteRead,
                prior: w.clone(),
            });

        let access = Access::new(epoch, false, site);
        self.reads = match std::mem::take(&mut self.reads) {
            ReadState::None => ReadState::Exclusive(access),
            ReadState::Exclusive(r) if r.tid() == tid => ReadState::Exclusive(access),
            ReadState::Exclusive(r) => {
                let mut readers = vec![r, access];
                readers.sort_by_key(Access::tid);
                ReadState::Shared(readers)
            }
            ReadState::Shared(mut readers) => {
                match readers.binary_search_by(|r| r.tid().cmp(&tid)) {
                    Ok(idx) => readers[idx] = access,
                    Err(idx) => readers.insert(idx, access),
                }
                ReadState::Shared(readers)
            }
        };

        conflict.map_or(AccessOutcome::Ordered, AccessOutcome::Race)
    }

    /// Process a write by `tid` with clock `vc`
    pub fn write(&mut self, tid: ThreadId, vc: &VectorClock, site: AccessSite) -> AccessOutcome {
        let epoch = vc.epoch(tid);
        if self.write.as_ref().is_some_and(|w| w.epoch == epoch) {
            return AccessOutcome::SameEpoch;
        }

        let unordered = |r: &&Access| r.tid() != tid && !r.epoch.happens_before(vc);
        let conflict = match &self.write {
            Some(w) if !w.epoch.happens_before(vc) => Some(Conflict {
                kind: RaceKind::WriteWrite,
                prior: w.clone(),
            }),
            _ => {
                let reader = match &self.reads {
                    ReadState::None => None,
                    ReadState::Exclusive(r) => Some(r).filter(unordered),
                    ReadState::Shared(rs) => rs.iter().find(unordered),
                };
                reader.map(|r| Conflict {
                    kind: RaceKind::ReadWrite,
                    prior: r.clone(),
                })
            }
        };

        self.write = Some(Access::new(epoch, true, site));
        self.reads = ReadState::None;

        conflict.map_or(AccessOutcome::Ordered, AccessOutcome::Race)
    }

    /// Forget everything, returning the most informative stored access
    ///
    /// Used when the location's memory is reallocated: the last write if
    /// any, otherwise a reader.
    pub fn reset(&mut self) -> Option<Access> {
        let write = self.write.take();
        let reads = std::mem::take(&mut self.reads);
        write.or(match reads {
            ReadState::None => None,
            ReadState::Exclusive(r) => Some(r),
            ReadState::Shared(rs) => rs.into_iter().max_by_key(|r| r.epoch.clock()),
        })
    }

    /// Check if nothing is recorded
    pub const fn is_empty(&self) -> bool {
        self.write.is_none() && matches!(self.reads, ReadState::None)
    }
}
