//! Shadow State
//!
//! Per-location access history. Each tracked address remembers only the
//! accesses that are not yet known to be ordered before whatever conflicting
//! access comes next:
//!
//! ```text
//!            read (same thread)        read (other thread)
//!   ┌────┐ ─────────────────▶ ┌─────────┐ ───────────────▶ ┌────────┐
//!   │none│                    │exclusive│                  │ shared │
//!   └────┘ ◀──────────────────┴─────────┴──────────────────┴────────┘
//!                             write (clears readers)
//! ```
//!
//! The last write is always a single access: writes to one location are
//! totally ordered unless they race, and a race is reported.

pub mod history;
pub mod site;

pub use history::{AccessHistory, AccessOutcome, Conflict, ReadState};
pub use site::{Access, AccessSite};
