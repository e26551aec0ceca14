//! Synchronization Objects
//!
//! Locks and explicit happens-before signals both carry a vector clock that
//! transfers ordering from a releasing thread to a later acquirer:
//!
//! ```text
//!   T1: ... release(L)        L.clock ⊔= C_T1 ; C_T1[T1] += 1
//!   T2:        acquire(L)     C_T2 ⊔= L.clock
//! ```
//!
//! Signals (`happens_before` / `happens_after`) use a bare `VectorClock` per
//! identifier; locks add holder bookkeeping in `LockState`.

pub mod state;

pub use state::{LockState, ReleaseOutcome};
