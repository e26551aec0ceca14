//! Recorded accesses

use crate::domain::clock::Epoch;
use crate::domain::thread::CallStack;
use racetrack_core::{AccessEntry, ThreadId};

/// Where an access happened
#[derive(Debug, Clone)]
pub struct AccessSite {
    /// Program counter of the access
    pub pc: usize,
    /// Access width in bytes
    pub size: usize,
    /// Call stack of the accessing thread at the time
    pub stack: CallStack,
}

impl AccessSite {
    /// Site without call-stack information
    pub const fn bare(pc: usize, size: usize) -> Self {
        Self {
            pc,
            size,
            stack: CallStack::new(),
        }
    }
}

/// One access stored in shadow state
#[derive(Debug, Clone)]
pub struct Access {
    /// Epoch of the accessing thread
    pub epoch: Epoch,
    /// Write (true) or read (false)
    pub write: bool,
    /// Report information
    pub site: AccessSite,
}

impl Access {
    /// Record an access
    pub const fn new(epoch: Epoch, write: bool, site: AccessSite) -> Self {
        Self { epoch, write, site }
    }

    /// Accessing thread
    #[inline]
    pub const fn tid(&self) -> ThreadId {
        self.epoch.tid()
    }

    /// Render as one side of a race report
    ///
    /// The stack keeps the innermost `depth` entries, access pc included.
    pub fn to_entry(&self, addr: usize, depth: usize) -> AccessEntry {
        let mut frames = self.site.stack.frames(depth.saturating_sub(1));
        frames.push(self.site.pc);
        AccessEntry::new(self.tid(), self.site.pc, addr, self.site.size, self.write)
            .with_stack(&frames)
    }
}
