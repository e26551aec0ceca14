//! Backend that accepts every event and does nothing

use racetrack_core::{Detector, RaceCallback, ThreadContext, ThreadId};

/// Stub backend
///
/// Useful to measure the cost of the instrumentation alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDetector;

impl NullDetector {
    /// Backend name
    pub const NAME: &'static str = "Dummy";

    /// Create the stub
    pub const fn new() -> Self {
        Self
    }
}

impl Detector for NullDetector {
    fn init(&self, _args: &[&str], _callback: RaceCallback) -> bool {
        true
    }

    fn finalize(&self) {}

    fn map_shadow(&self, _start: usize, _size: usize) {}

    fn read(&self, _ctx: ThreadContext, _pc: usize, _addr: usize, _size: usize) {}

    fn write(&self, _ctx: ThreadContext, _pc: usize, _addr: usize, _size: usize) {}

    fn allocate(&self, _ctx: ThreadContext, _pc: usize, _addr: usize, _size: usize) {}

    fn deallocate(&self, _ctx: ThreadContext, _addr: usize) {}

    fn acquire(&self, _ctx: ThreadContext, _lock: usize, _recursive: bool, _is_write: bool) {}

    fn release(&self, _ctx: ThreadContext, _lock: usize, _is_write: bool) {}

    fn happens_before(&self, _ctx: ThreadContext, _id: usize) {}

    fn happens_after(&self, _ctx: ThreadContext, _id: usize) {}

    fn fork(&self, _parent: ThreadContext, child: ThreadId) -> ThreadContext {
        ThreadContext::from(child)
    }

    fn join(&self, _parent: ThreadContext, _child: ThreadId) {}

    fn detach(&self, _ctx: ThreadContext, _tid: ThreadId) {}

    fn finish(&self, _ctx: ThreadContext, _tid: ThreadId) {}

    fn func_enter(&self, _ctx: ThreadContext, _pc: usize) {}

    fn func_exit(&self, _ctx: ThreadContext) {}

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
