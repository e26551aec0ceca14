//! # Thread Identity
//!
//! Every event carries the identity of the thread that produced it. The host
//! holds a `ThreadContext` per monitored thread (obtained from `fork`) and passes
//! it back explicitly; no thread-local storage is involved.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Thread identifier as assigned by the host
///
/// Identifiers are never reused within one detector session: once a thread is
/// joined or finished its id is retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub u32);

impl ThreadId {
    /// Create a new thread ID
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw id value
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Id as an index
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl From<u32> for ThreadId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Per-thread handle threaded through every detector call
///
/// Returned by `Detector::fork` for the child and handed back by the host on
/// each event the child produces.
///
/// # Examples
///
/// ```text
/// let child = detector.fork(main, ThreadId::new(2));
/// detector.write(child, pc, addr, 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadContext {
    tid: ThreadId,
}

impl ThreadContext {
    /// Create a handle for the given raw thread id
    #[inline]
    pub const fn new(tid: u32) -> Self {
        Self { tid: ThreadId(tid) }
    }

    /// Thread this handle belongs to
    #[inline]
    pub const fn tid(&self) -> ThreadId {
        self.tid
    }
}

impl From<ThreadId> for ThreadContext {
    fn from(tid: ThreadId) -> Self {
        Self { tid }
    }
}

impl fmt::Display for ThreadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThreadContext {{ tid: {} }}", self.tid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_id_display() {
        assert_eq!(ThreadId::new(7).to_string(), "T7");
    }

    #[test]
    fn thread_id_ordering() {
        assert!(ThreadId::new(1) < ThreadId::new(2));
        assert_eq!(ThreadId::from(3).as_usize(), 3);
    }

    #[test]
    fn context_wraps_tid() {
        let ctx = ThreadContext::new(4);
        assert_eq!(ctx.tid(), ThreadId::new(4));
        assert_eq!(ThreadContext::from(ThreadId::new(4)), ctx);
    }

    #[test]
    fn context_serialization() {
        let ctx = ThreadContext::new(9);
        let json = serde_json::to_string(&ctx).expect("should serialize");
        assert_eq!(json, r#"{"tid":9}"#);
        let back: ThreadContext = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(back, ctx);
    }
}
