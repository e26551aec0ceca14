//! Thread State
//!
//! One record per monitored thread: its vector clock, lifecycle and shadow
//! call stack.
//!
//! ```text
//!  UNBORN ──fork──▶ ACTIVE ──join──▶ (retired)
//!                     │
//!                   detach
//!                     ▼
//!                  DETACHED ──finish──▶ (retired)
//! ```
//!
//! Retired ids are remembered by the detector and never reused.

pub mod stack;
pub mod state;

pub use stack::CallStack;
pub use state::{Lifecycle, ThreadState};
