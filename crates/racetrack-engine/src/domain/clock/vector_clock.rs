//! Vector Clock Implementation
//!
//! Vector clocks track the happens-before relation between threads.
//!
//! # Theory
//!
//! Given clocks A and B:
//! - A ≤ B if every component of A is at most the same component of B
//! - A and B are concurrent if neither A ≤ B nor B ≤ A
//!
//! # Implementation
//!
//! Thread ids are sparse and unbounded, so the clock is a vector of epochs
//! sorted by thread id rather than a fixed array indexed by thread. Lookups
//! binary-search, `join` and `≤` are linear merge walks, and iteration order is
//! deterministic.

use super::epoch::{Clock, Epoch};
use racetrack_core::ThreadId;
use std::cmp::Ordering;
use std::fmt;

/// Vector clock for tracking causality
///
/// # Representation
///
/// ```text
/// entries: [1@T0, 4@T2, 7@T5]     (T1, T3, T4 implicitly 0)
/// ```
///
/// Components of value 0 are never stored.
#[derive(Clone, PartialEq, Eq, Default, Hash)]
pub struct VectorClock {
    entries: Vec<Epoch>,
}

impl VectorClock {
    /// Create an empty clock (every component 0)
    #[inline]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[inline]
    fn position(&self, tid: ThreadId) -> Result<usize, usize> {
        self.entries.binary_search_by(|e| e.tid().cmp(&tid))
    }

    /// Get the component for `tid` (0 when absent)
    #[inline]
    pub fn get(&self, tid: ThreadId) -> Clock {
        match self.position(tid) {
            Ok(idx) => self.entries[idx].clock(),
            Err(_) => 0,
        }
    }

    /// Current epoch of `tid` as seen by this clock
    #[inline]
    pub fn epoch(&self, tid: ThreadId) -> Epoch {
        Epoch::new(tid, self.get(tid))
    }

    /// Set the component for `tid`
    pub fn set(&mut self, tid: ThreadId, clock: Clock) {
        match self.position(tid) {
            Ok(idx) if clock == 0 => {
                self.entries.remove(idx);
            }
            Ok(idx) => self.entries[idx] = Epoch::new(tid, clock),
            Err(_) if clock == 0 => {}
            Err(idx) => self.entries.insert(idx, Epoch::new(tid, clock)),
        }
    }

    /// Increment the component for `tid`, returning the new value
    ///
    /// Saturates at `Clock::MAX`: past that point successive epochs of `tid`
    /// are equal and can no longer be told apart.
    ///
    /// ```text
    /// [3@T0, 1@T1].increment(T1)  →  [3@T0, 2@T1]
    /// ```
    #[inline]
    pub fn increment(&mut self, tid: ThreadId) -> Clock {
        match self.position(tid) {
            Ok(idx) => {
                let next = self.entries[idx].clock().saturating_add(1);
                self.entries[idx] = self.entries[idx].with_clock(next);
                next
            }
            Err(idx) => {
                self.entries.insert(idx, Epoch::new(tid, 1));
                1
            }
        }
    }

    /// Merge with another vector clock (element-wise max)
    ///
    /// ```text
    /// self:   [3@T0, 1@T1]
    /// other:  [2@T0, 5@T1, 1@T2]
    /// result: [3@T0, 5@T1, 1@T2]
    /// ```
    pub fn join(&mut self, other: &Self) {
        if other.entries.is_empty() {
            return;
        }
        if self.entries.is_empty() {
            self.entries.clone_from(&other.entries);
            return;
        }

        let (a, b) = (&self.entries, &other.entries);
        let mut merged = Vec::with_capacity(a.len().max(b.len()));
        let (mut i, mut j) = (0, 0);

        while i < a.len() && j < b.len() {
            match a[i].tid().cmp(&b[j].tid()) {
                Ordering::Less => {
                    merged.push(a[i]);
                    i += 1;
                }
                Ordering::Greater => {
                    merged.push(b[j]);
                    j += 1;
                }
                Ordering::Equal => {
                    merged.push(if a[i].clock() >= b[j].clock() { a[i] } else { b[j] });
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&a[i..]);
        merged.extend_from_slice(&b[j..]);

        self.entries = merged;
    }

    /// Element-wise minimum
    ///
    /// ```text
    /// self:   [3@T0, 1@T1]
    /// other:  [2@T0, 5@T1, 1@T2]
    /// result: [2@T0, 1@T1]
    /// ```
    pub fn meet(&mut self, other: &Self) {
        let b = &other.entries;
        let mut j = 0;
        self.entries.retain_mut(|e| {
            while j < b.len() && b[j].tid() < e.tid() {
                j += 1;
            }
            match b.get(j) {
                Some(o) if o.tid() == e.tid() => {
                    if o.clock() < e.clock() {
                        *e = *o;
                    }
                    true
                }
                _ => false,
            }
        });
    }

    /// Join of two clocks
    #[must_use]
    pub fn joined(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.join(other);
        out
    }

    /// Check if this clock happens-before (or equals) another
    ///
    /// # Definition
    ///
    /// A ≤ B iff for all t: A[t] ≤ B[t]. Reflexive, so every clock is ordered
    /// before itself.
    ///
    /// ```text
    /// [1@T0, 2@T1] ≤ [2@T0, 3@T1]   ✓
    /// [1@T0, 2@T1] ≤ [1@T0, 2@T1]   ✓
    /// [1@T0, 3@T1] ≤ [2@T0, 2@T1]   ✗
    /// [1@T4]       ≤ [9@T0]         ✗ (T4 absent on the right)
    /// ```
    pub fn happens_before(&self, other: &Self) -> bool {
        let b = &other.entries;
        let mut j = 0;

        for e in &self.entries {
            while j < b.len() && b[j].tid() < e.tid() {
                j += 1;
            }
            match b.get(j) {
                Some(o) if o.tid() == e.tid() => {
                    if e.clock() > o.clock() {
                        return false;
                    }
                }
                _ => return false,
            }
        }
        true
    }

    /// Check if two clocks are concurrent (neither happens-before the other)
    #[inline]
    pub fn concurrent(&self, other: &Self) -> bool {
        !self.happens_before(other) && !other.happens_before(self)
    }

    /// Non-zero components in thread-id order
    pub fn iter(&self) -> impl Iterator<Item = Epoch> + '_ {
        self.entries.iter().copied()
    }

    /// Number of non-zero components
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if every component is 0
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(ThreadId, Clock)> for VectorClock {
    fn from_iter<I: IntoIterator<Item = (ThreadId, Clock)>>(iter: I) -> Self {
        let mut vc = Self::new();
        for (tid, clock) in iter {
            if clock > vc.get(tid) {
                vc.set(tid, clock);
            }
        }
        vc
    }
}

impl fmt::Debug for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VC[")?;
        for (i, e) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{e:?}")?;
        }
        write!(f, "]")
    }
}
