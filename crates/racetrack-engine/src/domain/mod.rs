//! Domain Layer - Happens-Before Bookkeeping
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  Clock Module                  Thread Module                │
//! │  ├─ Epoch (tid, clock)         ├─ ThreadState (VC, stack)   │
//! │  └─ VectorClock                └─ CallStack (persistent)    │
//! │                                                             │
//! │  Shadow Module                 Lock Module                  │
//! │  ├─ AccessHistory              ├─ LockState (VC, holders)   │
//! │  └─ Access / AccessSite        └─ ReleaseOutcome            │
//! │                                                             │
//! │  Alloc Module                  Policy Module                │
//! │  ├─ AllocationTable            ├─ ConcurrentPolicy          │
//! │  └─ AllocationState            │    (RwLock + DashMap)      │
//! │                                └─ ReplayPolicy (RefCell)    │
//! │                                                             │
//! │                   Detector Module                           │
//! │                   └─ FastTrack<Policy>                      │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Monomorphization
//!
//! `FastTrack` is generic over a [`LockPolicy`]. Picking the policy picks
//! the synchronization of every shadow structure at compile time:
//!
//! ```text
//! ConcurrentFastTrack = FastTrack<ConcurrentPolicy>
//!   └─ parking_lot::RwLock per entity, DashMap per table, Send + Sync
//!
//! ReplayFastTrack = FastTrack<ReplayPolicy>
//!   └─ RefCell per entity, RefCell<HashMap> per table, single thread
//! ```
//!
//! ```rust
//! use racetrack_core::{Detector, ThreadContext, ThreadId};
//! use racetrack_engine::domain::ReplayFastTrack;
//!
//! let detector = ReplayFastTrack::default();
//! let main = ThreadContext::new(1);
//! let worker = detector.fork(main, ThreadId::new(2));
//! detector.write(main, 0x10, 0x1000, 8);
//! detector.write(worker, 0x20, 0x1000, 8);
//! assert_eq!(detector.stats().races, 1);
//! ```

pub mod alloc;
pub mod clock;
pub mod detector;
pub mod lock;
pub mod policy;
pub mod shadow;
pub mod thread;

// Re-export clock types
pub use clock::{Clock, Epoch, VectorClock};

// Re-export per-entity state
pub use alloc::{AllocationState, AllocationTable};
pub use lock::{LockState, ReleaseOutcome};
pub use shadow::{Access, AccessHistory, AccessOutcome, AccessSite, Conflict, ReadState};
pub use thread::{CallStack, Lifecycle, ThreadState};

// Re-export policies
pub use policy::{ConcurrentPolicy, LockPolicy, ReplayPolicy, ShadowLock, ShadowMap};

// Re-export the orchestrator
pub use detector::{
    ConcurrentFastTrack,
    DetectorStats,
    FastTrack,
    FastTrackBuilder,
    ReplayFastTrack,
    StatsSnapshot,
};
