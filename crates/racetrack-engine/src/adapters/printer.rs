//! Backend that logs every event and never reports

use racetrack_core::{Detector, RaceCallback, ThreadContext, ThreadId};
use tracing::info;

/// Event logger
///
/// Every event becomes one `info!` record on the `racetrack::printer`
/// target, which makes it handy for inspecting what a front end emits.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrinterDetector;

impl PrinterDetector {
    /// Backend name
    pub const NAME: &'static str = "Printer";

    /// Create the logger
    pub const fn new() -> Self {
        Self
    }
}

impl Detector for PrinterDetector {
    fn init(&self, args: &[&str], _callback: RaceCallback) -> bool {
        info!(target: "racetrack::printer", ?args, "init");
        true
    }

    fn finalize(&self) {
        info!(target: "racetrack::printer", "finalize");
    }

    fn map_shadow(&self, start: usize, size: usize) {
        info!(target: "racetrack::printer", start, size, "map_shadow");
    }

    fn read(&self, ctx: ThreadContext, pc: usize, addr: usize, size: usize) {
        info!(target: "racetrack::printer", %ctx, pc, addr, size, "read");
    }

    fn write(&self, ctx: ThreadContext, pc: usize, addr: usize, size: usize) {
        info!(target: "racetrack::printer", %ctx, pc, addr, size, "write");
    }

    fn allocate(&self, ctx: ThreadContext, pc: usize, addr: usize, size: usize) {
        info!(target: "racetrack::printer", %ctx, pc, addr, size, "allocate");
    }

    fn deallocate(&self, ctx: ThreadContext, addr: usize) {
        info!(target: "racetrack::printer", %ctx, addr, "deallocate");
    }

    fn acquire(&self, ctx: ThreadContext, lock: usize, recursive: bool, is_write: bool) {
        info!(target: "racetrack::printer", %ctx, lock, recursive, is_write, "acquire");
    }

    fn release(&self, ctx: ThreadContext, lock: usize, is_write: bool) {
        info!(target: "racetrack::printer", %ctx, lock, is_write, "release");
    }

    fn happens_before(&self, ctx: ThreadContext, id: usize) {
        info!(target: "racetrack::printer", %ctx, id, "happens_before");
    }

    fn happens_after(&self, ctx: ThreadContext, id: usize) {
        info!(target: "racetrack::printer", %ctx, id, "happens_after");
    }

    fn fork(&self, parent: ThreadContext, child: ThreadId) -> ThreadContext {
        info!(target: "racetrack::printer", %parent, %child, "fork");
        ThreadContext::from(child)
    }

    fn join(&self, parent: ThreadContext, child: ThreadId) {
        info!(target: "racetrack::printer", %parent, %child, "join");
    }

    fn detach(&self, ctx: ThreadContext, tid: ThreadId) {
        info!(target: "racetrack::printer", %ctx, %tid, "detach");
    }

    fn finish(&self, ctx: ThreadContext, tid: ThreadId) {
        info!(target: "racetrack::printer", %ctx, %tid, "finish");
    }

    fn func_enter(&self, ctx: ThreadContext, pc: usize) {
        info!(target: "racetrack::printer", %ctx, pc, "func_enter");
    }

    fn func_exit(&self, ctx: ThreadContext) {
        info!(target: "racetrack::printer", %ctx, "func_exit");
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use racetrack_core::Race;
    use std::sync::Arc;

    #[test]
    fn test_printer_never_reports() {
        let detector = PrinterDetector::new();
        assert!(detector.init(&[], Arc::new(|_: &Race| panic!("printer reported a race"))));
        let main = ThreadContext::new(1);
        let child = detector.fork(main, ThreadId::new(2));
        detector.write(main, 1, 0x100, 8);
        detector.write(child, 2, 0x100, 8);
        detector.join(main, ThreadId::new(2));
        detector.finalize();
        assert_eq!(detector.name(), "Printer");
    }
}
