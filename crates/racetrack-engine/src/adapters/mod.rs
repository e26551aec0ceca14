//! Adapters Layer - Backends behind the `Detector` contract
//!
//! The host talks to every backend through `racetrack_core::Detector`.
//! This layer holds the backends that are not the vector-clock engine and
//! the enum that picks one at construction.
//!
//! - `NullDetector`: drops every event
//! - `PrinterDetector`: logs every event
//! - `AnyDetector`: FastTrack, Null or Printer selected by `DetectorKind`

pub mod any;
pub mod null;
pub mod printer;

// Re-exports
pub use any::{AnyDetector, DetectorKind};
pub use null::NullDetector;
pub use printer::PrinterDetector;
