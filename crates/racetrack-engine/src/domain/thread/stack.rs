//! Shadow call stacks
//!
//! Every recorded access keeps a snapshot of its thread's call stack so a race
//! report can show where the earlier access happened, even after the thread
//! moved on or exited. Frames are immutable and shared between snapshots, so
//! taking a snapshot is one reference-count increment.

use std::sync::Arc;

#[derive(Debug)]
struct Frame {
    pc: usize,
    depth: usize,
    parent: Option<Arc<Frame>>,
}

/// Persistent stack of return addresses
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    top: Option<Arc<Frame>>,
}

impl CallStack {
    /// Empty stack
    pub const fn new() -> Self {
        Self { top: None }
    }

    /// Enter a function at `pc`
    pub fn push(&mut self, pc: usize) {
        let depth = self.depth() + 1;
        let parent = self.top.take();
        self.top = Some(Arc::new(Frame { pc, depth, parent }));
    }

    /// Leave the innermost function
    pub fn pop(&mut self) -> Option<usize> {
        let top = self.top.take()?;
        self.top.clone_from(&top.parent);
        Some(top.pc)
    }

    /// Number of frames
    #[inline]
    pub fn depth(&self) -> usize {
        self.top.as_ref().map_or(0, |f| f.depth)
    }

    /// Check if no function is active
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.top.is_none()
    }

    /// Innermost `limit` frames, outermost first
    pub fn frames(&self, limit: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(limit.min(self.depth()));
        let mut cur = self.top.as_deref();
        while let Some(frame) = cur {
            if out.len() == limit {
                break;
            }
            out.push(frame.pc);
            cur = frame.parent.as_deref();
        }
        out.reverse();
        out
    }
}

impl Drop for CallStack {
    // Unlink uniquely owned frames one by one; deep stacks would otherwise
    // recurse once per frame.
    fn drop(&mut self) {
        let mut next = self.top.take();
        while let Some(frame) = next {
            match Arc::try_unwrap(frame) {
                Ok(mut owned) => next = owned.parent.take(),
                Err(_) => break,
            }
        }
    }
}
