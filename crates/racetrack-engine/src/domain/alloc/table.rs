//! Live blocks and the freed-block graveyard

use super::state::AllocationState;
use crate::domain::clock::{Epoch, VectorClock};
use crate::domain::shadow::{Access, AccessHistory};
use racetrack_core::ThreadId;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;
use tracing::debug;

/// Why a free was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeError {
    /// The block starting at the address was already freed
    DoubleFree,
    /// No block starts at the address
    Unknown,
}

/// A use-after-free hit found by the boundary check
#[derive(Debug, Clone)]
pub struct StaleHit {
    /// Address of the earlier access
    pub addr: usize,
    /// The earlier access
    pub prior: Access,
    /// Freed block (base, size)
    pub block: (usize, usize),
}

/// Bytes covered by one entry of the freed-page filter, as a shift
pub const PAGE_SHIFT: u32 = 12;

/// Frees between two sweeps for observed frees
pub const SWEEP_EVERY: usize = 64;

/// Pages touched by `[base, base + size)`
pub fn pages(base: usize, size: usize) -> RangeInclusive<usize> {
    let last = base.saturating_add(size.max(1) - 1);
    (base >> PAGE_SHIFT)..=(last >> PAGE_SHIFT)
}

/// Result of a successful free
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Freed {
    /// The freed block (base, size)
    pub block: (usize, usize),
    /// Older freed blocks dropped to respect the graveyard limit
    pub evicted: Vec<(usize, usize)>,
    /// Enough frees went by to look for observed frees again
    pub sweep_due: bool,
}

/// All heap blocks known to the detector
///
/// ```text
/// live:   BTreeMap<base, AllocationState>     (non-overlapping)
/// freed:  BTreeMap<seq, AllocationState>      (oldest first)
/// index:  BTreeSet<(base, seq)>               (address lookups)
/// ```
///
/// Freed blocks may overlap each other, so an address lookup scans the
/// index from `addr - widest` where `widest` is the largest freed block
/// seen this session.
#[derive(Debug, Default)]
pub struct AllocationTable {
    live: BTreeMap<usize, AllocationState>,
    freed: BTreeMap<u64, AllocationState>,
    index: BTreeSet<(usize, u64)>,
    widest: usize,
    next_seq: u64,
    since_sweep: usize,
    max_freed: usize,
}

impl AllocationTable {
    /// Table retaining at most `max_freed` freed blocks (0 = unlimited)
    pub fn new(max_freed: usize) -> Self {
        Self {
            max_freed,
            ..Self::default()
        }
    }

    /// Register a new block
    pub fn allocate(&mut self, block: AllocationState) {
        if let Some(old) = self.live.insert(block.base(), block) {
            debug!(base = old.base(), "allocation replaced a live block without free");
        }
    }

    /// Freed blocks intersecting `[base, base + size)`, oldest first
    fn overlapping(&self, base: usize, size: usize) -> Vec<u64> {
        if self.freed.is_empty() {
            return Vec::new();
        }
        let lo = base.saturating_sub(self.widest.saturating_sub(1));
        let hi = base.saturating_add(size);
        let mut seqs: Vec<u64> = self
            .index
            .range((lo, 0)..(hi, 0))
            .map(|&(_, seq)| seq)
            .filter(|seq| self.freed.get(seq).is_some_and(|b| b.overlaps(base, size)))
            .collect();
        seqs.sort_unstable();
        seqs
    }

    fn remove_freed(&mut self, seq: u64) -> Option<(usize, usize)> {
        let block = self.freed.remove(&seq)?;
        self.index.remove(&(block.base(), seq));
        Some((block.base(), block.size()))
    }

    /// Prepare `[base, base + size)` for reuse
    ///
    /// Freed blocks overlapping the range become the reuse generation that
    /// receives stale accesses; older reused generations there retire.
    /// Returns whether any freed block overlaps, and the retired blocks.
    pub fn begin_reuse(&mut self, base: usize, size: usize) -> (bool, Vec<(usize, usize)>) {
        let mut retired = Vec::new();
        let mut any = false;
        for seq in self.overlapping(base, size) {
            let reused = self.freed.get(&seq).is_some_and(AllocationState::is_reused);
            if reused {
                retired.extend(self.remove_freed(seq));
            } else if let Some(block) = self.freed.get_mut(&seq) {
                block.mark_reused();
                any = true;
            }
        }
        (any, retired)
    }

    /// Keep the last access at `addr` on the newest freed block covering it
    pub fn stash(&mut self, addr: usize, access: Access) {
        if let Some(seq) = self.overlapping(addr, 1).pop() {
            if let Some(block) = self.freed.get_mut(&seq) {
                block.stash(addr, access);
            }
        }
    }

    /// Free the block starting at `base`, stamping it with `epoch`
    ///
    /// # Errors
    ///
    /// `FreeError::DoubleFree` if the block is already in the graveyard,
    /// `FreeError::Unknown` if no block starts at `base`.
    pub fn free(&mut self, base: usize, epoch: Epoch) -> Result<Freed, FreeError> {
        let Some(mut block) = self.live.remove(&base) else {
            let freed_here = self
                .index
                .range((base, 0)..=(base, u64::MAX))
                .any(|(_, seq)| self.freed.get(seq).is_some_and(|b| !b.is_reused()));
            return Err(if freed_here {
                FreeError::DoubleFree
            } else {
                FreeError::Unknown
            });
        };

        block.free(epoch);
        let range = (block.base(), block.size());
        let seq = self.next_seq;
        self.next_seq += 1;
        self.widest = self.widest.max(block.size());
        self.index.insert((block.base(), seq));
        self.freed.insert(seq, block);

        let mut evicted = Vec::new();
        if self.max_freed != 0 {
            while self.freed.len() > self.max_freed {
                let Some(&oldest) = self.freed.keys().next() else {
                    break;
                };
                evicted.extend(self.remove_freed(oldest));
            }
        }

        self.since_sweep += 1;
        Ok(Freed {
            block: range,
            evicted,
            sweep_due: self.since_sweep >= SWEEP_EVERY,
        })
    }

    /// Drop every freed block whose free happens before `floor`
    ///
    /// `floor` is a clock every live thread has reached, so no live thread
    /// can access such a block unordered with its free any more.
    pub fn retire_observed(&mut self, floor: &VectorClock) -> Vec<(usize, usize)> {
        self.since_sweep = 0;
        let observed: Vec<u64> = self
            .freed
            .iter()
            .filter(|(_, b)| b.dealloc().is_some_and(|e| e.happens_before(floor)))
            .map(|(&seq, _)| seq)
            .collect();
        observed
            .into_iter()
            .filter_map(|seq| self.remove_freed(seq))
            .collect()
    }

    /// Check if a freed block still covers part of `page`
    pub fn covers_page(&self, page: usize) -> bool {
        !self.overlapping(page << PAGE_SHIFT, 1 << PAGE_SHIFT).is_empty()
    }

    /// Live block containing `addr`, as (base, size)
    pub fn block_of(&self, addr: usize) -> Option<(usize, usize)> {
        self.live
            .range(..=addr)
            .next_back()
            .map(|(_, block)| block)
            .filter(|block| block.contains(addr))
            .map(|block| (block.base(), block.size()))
    }

    fn stale_candidate(&self, tid: ThreadId, addr: usize, vc: &VectorClock) -> Option<u64> {
        self.overlapping(addr, 1).into_iter().rev().find(|seq| {
            self.freed.get(seq).is_some_and(|b| {
                b.unordered_with(tid, vc) && !b.was_reported(tid, addr)
            })
        })
    }

    /// Look for an unreported use-after-free without recording it
    pub fn has_stale_hit(&self, tid: ThreadId, addr: usize, vc: &VectorClock) -> bool {
        self.stale_candidate(tid, addr, vc).is_some()
    }

    /// Find an unreported use-after-free and mark it reported
    ///
    /// `history` is the current shadow state at `addr`, consulted when the
    /// block kept no stale access there.
    pub fn claim(
        &mut self,
        tid: ThreadId,
        addr: usize,
        vc: &VectorClock,
        history: Option<&AccessHistory>,
    ) -> Option<StaleHit> {
        let seq = self.stale_candidate(tid, addr, vc)?;
        let block = self.freed.get_mut(&seq)?;
        block.mark_reported(tid, addr);
        let (prior_addr, prior) = block.prior_access(tid, addr, history);
        Some(StaleHit {
            addr: prior_addr,
            prior,
            block: (block.base(), block.size()),
        })
    }

    /// Check if no freed block is retained
    #[inline]
    pub fn graveyard_is_empty(&self) -> bool {
        self.freed.is_empty()
    }

    /// Number of live blocks
    pub fn live_len(&self) -> usize {
        self.live.len()
    }

    /// Number of retained freed blocks
    pub fn freed_len(&self) -> usize {
        self.freed.len()
    }

    /// Drop every block
    pub fn clear(&mut self) {
        self.live.clear();
        self.freed.clear();
        self.index.clear();
        self.widest = 0;
        self.since_sweep = 0;
    }

    /// Change the graveyard limit for the next session
    pub fn set_max_freed(&mut self, max_freed: usize) {
        self.max_freed = max_freed;
    }
}
