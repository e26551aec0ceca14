//! Allocation Tracking
//!
//! Heap blocks are tracked so that a race across a free/reallocate boundary
//! is attributed to the right accesses:
//!
//! ```text
//!   T1: alloc(a) write(a) free(a)
//!   T2:                           alloc(a) write(a)    ← unordered with free?
//! ```
//!
//! On reallocation the shadow histories of the range are reset (the new
//! block starts clean) but the last pre-free access of every address is kept
//! on the freed record. Any later access by another thread that has not
//! observed the free is a use-after-free race against that stale access.
//! Before reuse the race is reported against the access still recorded in
//! the location's shadow state.
//!
//! A freed block leaves the graveyard once
//! - the graveyard limit evicts it,
//! - its range is reused a second time, or
//! - every live thread has observed its free.

pub mod state;
pub mod table;

pub use state::AllocationState;
pub use table::{pages, AllocationTable, FreeError, Freed, StaleHit, PAGE_SHIFT, SWEEP_EVERY};
