//! Infrastructure Layer - External Technology Stack
//!
//! Concrete integrations that depend on I/O and serialization.
//!
//! # Responsibilities
//! - Trace serialization (JSON lines via serde)
//! - Offline replay of captured traces through any backend

pub mod replay;

// Re-exports
pub use replay::{read_trace, replay, replay_file, write_trace, ReplayError, ReplayReport, TraceEvent};
