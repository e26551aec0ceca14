//! # Detector Errors & Usage Anomalies
//!
//! Races are not errors; they are delivered through the race callback.
//! This module covers the two remaining failure channels:
//!
//! - `DetectorError`: configuration problems and resource exhaustion
//! - `UsageAnomaly`: host protocol misuse observed in the event stream
//!   (double free, unmatched release, ...). Anomalies are reported and
//!   counted, never fatal.

use crate::context::ThreadId;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Detector Errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Errors raised by the detector itself
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectorError {
    /// Malformed `init` argument
    #[error("invalid argument {arg}: {reason}")]
    InvalidArgument {
        /// Offending argument
        arg: String,
        /// What was wrong with it
        reason: String,
    },

    /// A configured capacity was reached; the entity stays untracked
    #[error("{resource} capacity exhausted (limit {limit})")]
    CapacityExhausted {
        /// Kind of tracked entity
        resource: &'static str,
        /// Configured limit
        limit: usize,
    },

    /// `finalize` observed threads that never reached a terminal state
    #[error("finalize with {0} live thread(s)")]
    LiveThreadsAtFinalize(usize),
}

impl DetectorError {
    /// Check if error is a resource exhaustion issue
    pub const fn is_resource_error(&self) -> bool {
        matches!(self, Self::CapacityExhausted { .. })
    }

    /// Build an `InvalidArgument` error
    pub fn invalid_argument(arg: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg: arg.into(),
            reason: reason.into(),
        }
    }
}

/// Detector result type for convenience
pub type DetectorResult<T> = Result<T, DetectorError>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Usage Anomalies
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Protocol violations by the monitored program or the host
///
/// The offending event leaves detector state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageAnomaly {
    /// `deallocate` of a block that was already freed
    #[error("double free of {addr:#x} by {thread}")]
    DoubleFree {
        /// Freeing thread
        thread: ThreadId,
        /// Block start
        addr: usize,
    },

    /// `deallocate` of an address that starts no tracked block
    #[error("free of unknown allocation {addr:#x} by {thread}")]
    UnknownAllocation {
        /// Freeing thread
        thread: ThreadId,
        /// Address passed to free
        addr: usize,
    },

    /// `release` by a thread that does not hold the lock
    #[error("release of {lock:#x} by {thread} without matching acquire")]
    ReleaseWithoutAcquire {
        /// Releasing thread
        thread: ThreadId,
        /// Lock identifier
        lock: usize,
    },

    /// Join or finish of a thread the detector never saw (or already retired)
    #[error("unknown thread {thread}")]
    UnknownThread {
        /// Referenced thread
        thread: ThreadId,
    },

    /// Join of a detached thread
    #[error("{parent} joined detached thread {child}")]
    JoinDetached {
        /// Joining thread
        parent: ThreadId,
        /// Detached child
        child: ThreadId,
    },

    /// Fork reused a live or retired thread id
    #[error("thread id {child} reused by fork from {parent}")]
    ThreadReused {
        /// Forking thread
        parent: ThreadId,
        /// Reused id
        child: ThreadId,
    },

    /// `func_exit` without a matching `func_enter`
    #[error("call stack underflow on {thread}")]
    StackUnderflow {
        /// Thread whose shadow stack was empty
        thread: ThreadId,
    },
}

impl UsageAnomaly {
    /// Thread that produced the anomalous event
    pub const fn thread(&self) -> ThreadId {
        match self {
            Self::DoubleFree { thread, .. }
            | Self::UnknownAllocation { thread, .. }
            | Self::ReleaseWithoutAcquire { thread, .. }
            | Self::UnknownThread { thread }
            | Self::StackUnderflow { thread } => *thread,
            Self::JoinDetached { parent, .. } | Self::ThreadReused { parent, .. } => *parent,
        }
    }

    /// Check if the anomaly concerns heap bookkeeping
    pub const fn is_memory_anomaly(&self) -> bool {
        matches!(self, Self::DoubleFree { .. } | Self::UnknownAllocation { .. })
    }
}
