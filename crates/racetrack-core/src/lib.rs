//! # Racetrack Core
//!
//! Shared contract layer between an instrumentation front end and the
//! race-detection backends.
//! Defines the race report ABI, thread handles, configuration and error types.
//!
//! ## Module Organization
//!
//! - `abi`: FFI-safe race report layout (`AccessEntry`, `Race`)
//! - `config`: Detector configuration and `init` argument parsing
//! - `context`: Thread identity and the per-thread handle passed on every event
//! - `error`: Detector errors and usage anomalies
//! - `traits`: The `Detector` capability contract

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod abi;
pub mod config;
pub mod context;
pub mod error;
pub mod traits;

// Re-export commonly used types
pub use abi::{AccessEntry, Race, RaceKind, MAX_STACK_SIZE};
pub use config::{DetectorConfig, DetectorConfigBuilder, DEFAULT_MAX_FREED_ALLOCATIONS};
pub use context::{ThreadContext, ThreadId};
pub use error::{DetectorError, DetectorResult, UsageAnomaly};
pub use traits::{AnomalyCallback, Detector, RaceCallback};

/// Library version
pub const RACETRACK_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Race report ABI version for compatibility checking
pub const REPORT_ABI_VERSION: u32 = 1u32 << 16; // 1.0.0
