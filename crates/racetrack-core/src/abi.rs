//! # Race Report ABI v1.0.0
//!
//! FFI-safe layout of the race report handed to the host callback.
//! All structures use `#[repr(C)]` with explicit alignment for ABI stability.

use crate::context::ThreadId;
use std::fmt;

/// Maximum number of call-stack frames captured per access
pub const MAX_STACK_SIZE: usize = 16;

/// Classification of a reported race
///
/// The two accesses of a race are symmetric; the kind records which of the
/// conflicting access pairs triggered the report.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RaceKind {
    /// Two unordered writes
    WriteWrite = 1,
    /// Earlier write, later unordered read
    WriteRead = 2,
    /// Earlier read, later unordered write
    ReadWrite = 3,
    /// Access to a reused address range without observing the free
    UseAfterFree = 4,
}

impl RaceKind {
    /// Short label used in logs
    pub const fn label(self) -> &'static str {
        match self {
            Self::WriteWrite => "write/write",
            Self::WriteRead => "write/read",
            Self::ReadWrite => "read/write",
            Self::UseAfterFree => "use-after-free",
        }
    }
}

impl fmt::Display for RaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One side of a race
///
/// **Memory Layout (184 bytes on 64-bit)**:
/// - Offset 0: `thread_id` (u32)
/// - Offset 4: `write`, `atomic`, `on_heap`, `_reserved` (4 × u8)
/// - Offset 8: `pc`, `accessed_memory`, `access_size`, `heap_block_begin`,
///   `heap_block_size`, `stack_size` (6 × usize)
/// - Offset 56: `stack_trace` (`MAX_STACK_SIZE` × usize)
///
/// The stack is ordered outermost frame first and ends with the access pc.
#[repr(C, align(8))]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AccessEntry {
    /// Accessing thread
    pub thread_id: u32,
    /// Write (true) or read (false)
    pub write: bool,
    /// Atomic access
    pub atomic: bool,
    /// Address belongs to a tracked heap block
    pub on_heap: bool,
    /// Reserved for future flags
    pub _reserved: u8,
    /// Program counter of the access
    pub pc: usize,
    /// Accessed address
    pub accessed_memory: usize,
    /// Access width in bytes
    pub access_size: usize,
    /// First byte of the enclosing heap block (0 when not on heap)
    pub heap_block_begin: usize,
    /// Size of the enclosing heap block (0 when not on heap)
    pub heap_block_size: usize,
    /// Number of valid entries in `stack_trace`
    pub stack_size: usize,
    /// Captured call stack
    pub stack_trace: [usize; MAX_STACK_SIZE],
}

impl AccessEntry {
    /// Create an entry with an empty stack
    pub const fn new(thread: ThreadId, pc: usize, addr: usize, size: usize, write: bool) -> Self {
        Self {
            thread_id: thread.as_u32(),
            write,
            atomic: false,
            on_heap: false,
            _reserved: 0,
            pc,
            accessed_memory: addr,
            access_size: size,
            heap_block_begin: 0,
            heap_block_size: 0,
            stack_size: 0,
            stack_trace: [0; MAX_STACK_SIZE],
        }
    }

    /// Attach a call stack (outermost first)
    ///
    /// Stacks deeper than `MAX_STACK_SIZE` keep their innermost frames.
    #[must_use]
    pub fn with_stack(mut self, frames: &[usize]) -> Self {
        let skip = frames.len().saturating_sub(MAX_STACK_SIZE);
        let kept = &frames[skip..];
        self.stack_trace[..kept.len()].copy_from_slice(kept);
        self.stack_size = kept.len();
        self
    }

    /// Mark the access as belonging to a heap block
    #[must_use]
    pub const fn with_heap_block(mut self, begin: usize, size: usize) -> Self {
        self.on_heap = true;
        self.heap_block_begin = begin;
        self.heap_block_size = size;
        self
    }

    /// Accessing thread
    pub const fn thread(&self) -> ThreadId {
        ThreadId::new(self.thread_id)
    }

    /// Valid part of the captured stack
    pub fn stack(&self) -> &[usize] {
        &self.stack_trace[..self.stack_size.min(MAX_STACK_SIZE)]
    }
}

impl fmt::Debug for AccessEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessEntry")
            .field("thread_id", &self.thread_id)
            .field("write", &self.write)
            .field("atomic", &self.atomic)
            .field("on_heap", &self.on_heap)
            .field("pc", &format_args!("{:#x}", self.pc))
            .field("accessed_memory", &format_args!("{:#x}", self.accessed_memory))
            .field("access_size", &self.access_size)
            .field("heap_block_begin", &format_args!("{:#x}", self.heap_block_begin))
            .field("heap_block_size", &self.heap_block_size)
            .field("stack", &self.stack())
            .finish()
    }
}

impl fmt::Display for AccessEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} bytes at {:#x} by T{} (pc {:#x})",
            if self.write { "write" } else { "read" },
            self.access_size,
            self.accessed_memory,
            self.thread_id,
            self.pc
        )
    }
}

/// A pair of mutually unordered conflicting accesses
///
/// **Memory Layout (376 bytes on 64-bit)**:
/// - Offset 0: `kind` (u32)
/// - Offset 4: `_reserved` (u32)
/// - Offset 8: `first` (`AccessEntry`)
/// - Offset 192: `second` (`AccessEntry`)
#[repr(C, align(8))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Race {
    /// Which conflict was detected
    pub kind: RaceKind,
    /// Reserved for future use (alignment padding)
    pub _reserved: u32,
    /// Earlier access (recorded in shadow state)
    pub first: AccessEntry,
    /// Access being processed when the race was found
    pub second: AccessEntry,
}

impl Race {
    /// Build a report
    pub const fn new(kind: RaceKind, first: AccessEntry, second: AccessEntry) -> Self {
        Self {
            kind,
            _reserved: 0,
            first,
            second,
        }
    }

    /// Threads involved, earlier access first
    pub const fn threads(&self) -> (ThreadId, ThreadId) {
        (self.first.thread(), self.second.thread())
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} race: {} <-> {}", self.kind, self.first, self.second)
    }
}
