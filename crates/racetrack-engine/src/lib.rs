//! Racetrack Engine
//!
//! # Overview
//!
//! `racetrack-engine` is a dynamic data-race detector built on vector clocks
//! with the FastTrack epoch optimization. A host (usually a binary
//! instrumentation front end) forwards every memory access, lock operation,
//! thread lifecycle event and heap operation of the monitored program; the
//! engine tracks happens-before and reports pairs of conflicting accesses that
//! are mutually unordered.
//!
//! # Architecture
//!
//! - **Domain**: clocks, per-thread/lock/location/allocation state and the
//!   `FastTrack` orchestrator
//! - **Infrastructure**: offline trace replay (JSON lines)
//! - **Adapters**: alternate backends behind the same `Detector` contract and
//!   the enum used to pick one at construction
//!
//! # Happens-Before Rules
//!
//! ## Access Rules
//! - A write races with the last write and with every read not ordered
//!   before it
//! - A read races with the last write not ordered before it
//! - Repeats within one epoch take the fast path and are not checked
//!
//! ## Synchronization Rules
//! - Release publishes the releasing thread's clock into the lock
//! - Acquire joins the lock's clock into the acquiring thread
//! - Fork orders the parent's prefix before the child; join orders the
//!   child before the parent's suffix
//!
//! ## Memory Rules
//! - A reused block carries the accesses made before its free; a thread that
//!   did not observe the free races with them
//!
//! # Usage
//!
//! ```rust
//! use racetrack_core::{Detector, ThreadContext, ThreadId};
//! use racetrack_engine::ConcurrentFastTrack;
//! use std::sync::{Arc, Mutex};
//!
//! let races = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&races);
//! let detector = ConcurrentFastTrack::builder()
//!     .on_race(move |race| sink.lock().unwrap().push(*race))
//!     .build();
//!
//! let main = ThreadContext::new(1);
//! let worker = detector.fork(main, ThreadId::new(2));
//!
//! // Lock-protected accesses are ordered
//! detector.acquire(main, 0xA, false, true);
//! detector.write(main, 0x10, 0x200, 8);
//! detector.release(main, 0xA, true);
//! detector.acquire(worker, 0xA, false, true);
//! detector.read(worker, 0x20, 0x200, 8);
//! detector.release(worker, 0xA, true);
//! assert!(races.lock().unwrap().is_empty());
//!
//! // Unprotected ones are not
//! detector.write(worker, 0x30, 0x100, 8);
//! detector.write(main, 0x40, 0x100, 8);
//! assert_eq!(races.lock().unwrap().len(), 1);
//! ```
//!
//! # Feature Flags
//!
//! - `kani` (cfg): bounded proofs of the vector-clock algebra

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

// Trinity Architecture Layers
pub mod adapters;
pub mod domain;
pub mod infrastructure;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Re-export Primary Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

// Clock types
pub use domain::{Clock, Epoch, VectorClock};

// Engine types
pub use domain::{
    ConcurrentFastTrack,
    DetectorStats,
    FastTrack,
    FastTrackBuilder,
    ReplayFastTrack,
    StatsSnapshot,
};

// Policy types
pub use domain::{ConcurrentPolicy, LockPolicy, ReplayPolicy};

// Backend selection
pub use adapters::{AnyDetector, DetectorKind, NullDetector, PrinterDetector};

// Replay
pub use infrastructure::replay::{replay, replay_file, ReplayError, ReplayReport, TraceEvent};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
