//! Logical Clocks
//!
//! Happens-before is decided with two representations:
//!
//! - `Epoch`: a packed (thread, clock) pair, enough to describe a single
//!   access. Comparing an epoch against a vector clock is one lookup.
//! - `VectorClock`: the full per-thread view, kept by threads, locks and
//!   shared-read histories.
//!
//! ```text
//! epoch (u, c) ≼ C   ⟺   c ≤ C[u]
//! A ≤ B              ⟺   ∀t: A[t] ≤ B[t]   (absent = 0)
//! ```

pub mod epoch;
pub mod vector_clock;

#[cfg(kani)]
mod proofs;

pub use epoch::{Clock, Epoch};
pub use vector_clock::VectorClock;
