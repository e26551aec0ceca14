//! Backend selection at construction
//!
//! ```text
//! "fasttrack" ─┐                  ┌─ AnyDetector::FastTrack(ConcurrentFastTrack)
//! "dummy"     ─┼─ DetectorKind ──▶├─ AnyDetector::Null(NullDetector)
//! "printer"   ─┘                  └─ AnyDetector::Printer(PrinterDetector)
//! ```
//!
//! Calls are forwarded by a `match`, so the hot path stays statically
//! dispatched inside each arm.

use super::{NullDetector, PrinterDetector};
use crate::domain::ConcurrentFastTrack;
use racetrack_core::{
    Detector, DetectorConfig, DetectorError, RaceCallback, ThreadContext, ThreadId,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Available backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    /// Vector-clock race detection
    #[default]
    FastTrack,
    /// Accept and drop every event
    Dummy,
    /// Log every event
    Printer,
}

impl DetectorKind {
    /// Every selectable backend
    pub const ALL: [Self; 3] = [Self::FastTrack, Self::Dummy, Self::Printer];

    /// Name accepted by `from_str`
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FastTrack => "fasttrack",
            Self::Dummy => "dummy",
            Self::Printer => "printer",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectorKind {
    type Err = DetectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fasttrack" | "ft" => Ok(Self::FastTrack),
            "dummy" | "null" => Ok(Self::Dummy),
            "printer" => Ok(Self::Printer),
            other => Err(DetectorError::invalid_argument(
                other,
                "expected one of fasttrack, dummy, printer",
            )),
        }
    }
}

/// One of the backends, chosen at construction
pub enum AnyDetector {
    /// Vector-clock engine
    FastTrack(ConcurrentFastTrack),
    /// Stub
    Null(NullDetector),
    /// Event logger
    Printer(PrinterDetector),
}

impl AnyDetector {
    /// Build the backend for `kind`
    ///
    /// `config` only affects the FastTrack engine.
    pub fn new(kind: DetectorKind, config: DetectorConfig) -> Self {
        match kind {
            DetectorKind::FastTrack => Self::FastTrack(ConcurrentFastTrack::new(config)),
            DetectorKind::Dummy => Self::Null(NullDetector::new()),
            DetectorKind::Printer => Self::Printer(PrinterDetector::new()),
        }
    }

    /// Kind of the wrapped backend
    pub const fn kind(&self) -> DetectorKind {
        match self {
            Self::FastTrack(_) => DetectorKind::FastTrack,
            Self::Null(_) => DetectorKind::Dummy,
            Self::Printer(_) => DetectorKind::Printer,
        }
    }

    /// The FastTrack engine, if selected
    pub const fn as_fasttrack(&self) -> Option<&ConcurrentFastTrack> {
        match self {
            Self::FastTrack(detector) => Some(detector),
            Self::Null(_) | Self::Printer(_) => None,
        }
    }
}

impl Default for AnyDetector {
    fn default() -> Self {
        Self::new(DetectorKind::default(), DetectorConfig::default())
    }
}

impl fmt::Debug for AnyDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnyDetector").field(&self.kind()).finish()
    }
}

macro_rules! dispatch {
    ($self:ident, $detector:ident => $call:expr) => {
        match $self {
            AnyDetector::FastTrack($detector) => $call,
            AnyDetector::Null($detector) => $call,
            AnyDetector::Printer($detector) => $call,
        }
    };
}

impl Detector for AnyDetector {
    fn init(&self, args: &[&str], callback: RaceCallback) -> bool {
        dispatch!(self, d => d.init(args, callback))
    }

    fn finalize(&self) {
        dispatch!(self, d => d.finalize());
    }

    fn map_shadow(&self, start: usize, size: usize) {
        dispatch!(self, d => d.map_shadow(start, size));
    }

    #[inline]
    fn read(&self, ctx: ThreadContext, pc: usize, addr: usize, size: usize) {
        dispatch!(self, d => d.read(ctx, pc, addr, size));
    }

    #[inline]
    fn write(&self, ctx: ThreadContext, pc: usize, addr: usize, size: usize) {
        dispatch!(self, d => d.write(ctx, pc, addr, size));
    }

    fn allocate(&self, ctx: ThreadContext, pc: usize, addr: usize, size: usize) {
        dispatch!(self, d => d.allocate(ctx, pc, addr, size));
    }

    fn deallocate(&self, ctx: ThreadContext, addr: usize) {
        dispatch!(self, d => d.deallocate(ctx, addr));
    }

    fn acquire(&self, ctx: ThreadContext, lock: usize, recursive: bool, is_write: bool) {
        dispatch!(self, d => d.acquire(ctx, lock, recursive, is_write));
    }

    fn release(&self, ctx: ThreadContext, lock: usize, is_write: bool) {
        dispatch!(self, d => d.release(ctx, lock, is_write));
    }

    fn happens_before(&self, ctx: ThreadContext, id: usize) {
        dispatch!(self, d => d.happens_before(ctx, id));
    }

    fn happens_after(&self, ctx: ThreadContext, id: usize) {
        dispatch!(self, d => d.happens_after(ctx, id));
    }

    fn fork(&self, parent: ThreadContext, child: ThreadId) -> ThreadContext {
        dispatch!(self, d => d.fork(parent, child))
    }

    fn join(&self, parent: ThreadContext, child: ThreadId) {
        dispatch!(self, d => d.join(parent, child));
    }

    fn detach(&self, ctx: ThreadContext, tid: ThreadId) {
        dispatch!(self, d => d.detach(ctx, tid));
    }

    fn finish(&self, ctx: ThreadContext, tid: ThreadId) {
        dispatch!(self, d => d.finish(ctx, tid));
    }

    fn func_enter(&self, ctx: ThreadContext, pc: usize) {
        dispatch!(self, d => d.func_enter(ctx, pc));
    }

    fn func_exit(&self, ctx: ThreadContext) {
        dispatch!(self, d => d.func_exit(ctx));
    }

    fn name(&self) -> &'static str {
        dispatch!(self, d => d.name())
    }

    fn version(&self) -> &'static str {
        dispatch!(self, d => d.version())
    }
}
