//! Offline Trace Replay
//!
//! A captured event stream is stored as JSON lines, one [`TraceEvent`] per
//! line, tagged by `event`:
//!
//! ```text
//! {"event":"fork","parent":1,"child":2}
//! {"event":"write","tid":1,"pc":16,"addr":256,"size":8}
//! {"event":"acquire","tid":2,"lock":4096,"recursive":false,"is_write":true}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. [`replay`] feeds the
//! events in order to any [`Detector`]; [`replay_file`] runs a file through a
//! single-threaded engine and collects what it found.

use crate::domain::{ReplayFastTrack, StatsSnapshot};
use parking_lot::Mutex;
use racetrack_core::{Detector, DetectorConfig, Race, ThreadContext, ThreadId, UsageAnomaly};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Replay failures
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// Trace could not be read or written
    #[error("trace I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A line is not a valid event
    #[error("malformed event on line {line}: {source}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// An event could not be encoded
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const fn exclusive() -> bool {
    true
}

/// One recorded host event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// `parent` creates `child`
    Fork {
        /// Creating thread
        parent: ThreadId,
        /// New thread
        child: ThreadId,
    },
    /// `parent` waits for `child`
    Join {
        /// Waiting thread
        parent: ThreadId,
        /// Finished thread
        child: ThreadId,
    },
    /// `tid` becomes unjoinable
    Detach {
        /// Reporting thread
        by: ThreadId,
        /// Detached thread
        tid: ThreadId,
    },
    /// `tid` exits without join
    Finish {
        /// Reporting thread
        by: ThreadId,
        /// Exiting thread
        tid: ThreadId,
    },
    /// Memory read
    Read {
        /// Accessing thread
        tid: ThreadId,
        /// Program counter
        pc: usize,
        /// Address
        addr: usize,
        /// Access size in bytes
        size: usize,
    },
    /// Memory write
    Write {
        /// Accessing thread
        tid: ThreadId,
        /// Program counter
        pc: usize,
        /// Address
        addr: usize,
        /// Access size in bytes
        size: usize,
    },
    /// Lock obtained
    Acquire {
        /// Acquiring thread
        tid: ThreadId,
        /// Lock identity
        lock: usize,
        /// Lock supports re-entry
        #[serde(default)]
        recursive: bool,
        /// Exclusive (`true`) or shared acquisition
        #[serde(default = "exclusive")]
        is_write: bool,
    },
    /// Lock given up
    Release {
        /// Releasing thread
        tid: ThreadId,
        /// Lock identity
        lock: usize,
        /// Exclusive (`true`) or shared release
        #[serde(default = "exclusive")]
        is_write: bool,
    },
    /// Heap allocation
    Alloc {
        /// Allocating thread
        tid: ThreadId,
        /// Program counter of the allocation
        pc: usize,
        /// Block base
        addr: usize,
        /// Block size
        size: usize,
    },
    /// Heap deallocation
    Free {
        /// Freeing thread
        tid: ThreadId,
        /// Block base
        addr: usize,
    },
    /// Source side of an explicit edge
    HappensBefore {
        /// Signalling thread
        tid: ThreadId,
        /// Edge identity
        id: usize,
    },
    /// Sink side of an explicit edge
    HappensAfter {
        /// Waiting thread
        tid: ThreadId,
        /// Edge identity
        id: usize,
    },
    /// Function entry
    FuncEnter {
        /// Calling thread
        tid: ThreadId,
        /// Function address
        pc: usize,
    },
    /// Function exit
    FuncExit {
        /// Returning thread
        tid: ThreadId,
    },
    /// Application memory region announcement
    MapShadow {
        /// Region start
        start: usize,
        /// Region size
        size: usize,
    },
}

impl TraceEvent {
    /// Forward this event to `detector`
    pub fn apply<D: Detector + ?Sized>(&self, detector: &D) {
        let ctx = |tid: ThreadId| ThreadContext::from(tid);
        match *self {
            Self::Fork { parent, child } => {
                detector.fork(ctx(parent), child);
            }
            Self::Join { parent, child } => detector.join(ctx(parent), child),
            Self::Detach { by, tid } => detector.detach(ctx(by), tid),
            Self::Finish { by, tid } => detector.finish(ctx(by), tid),
            Self::Read { tid, pc, addr, size } => detector.read(ctx(tid), pc, addr, size),
            Self::Write { tid, pc, addr, size } => detector.write(ctx(tid), pc, addr, size),
            Self::Acquire {
                tid,
                lock,
                recursive,
                is_write,
            } => detector.acquire(ctx(tid), lock, recursive, is_write),
            Self::Release { tid, lock, is_write } => detector.release(ctx(tid), lock, is_write),
            Self::Alloc { tid, pc, addr, size } => detector.allocate(ctx(tid), pc, addr, size),
            Self::Free { tid, addr } => detector.deallocate(ctx(tid), addr),
            Self::HappensBefore { tid, id } => detector.happens_before(ctx(tid), id),
            Self::HappensAfter { tid, id } => detector.happens_after(ctx(tid), id),
            Self::FuncEnter { tid, pc } => detector.func_enter(ctx(tid), pc),
            Self::FuncExit { tid } => detector.func_exit(ctx(tid)),
            Self::MapShadow { start, size } => detector.map_shadow(start, size),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reading & Writing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Decode the events of a trace lazily, tagging parse errors with their line
fn events(reader: impl BufRead) -> impl Iterator<Item = Result<TraceEvent, ReplayError>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(index, line)| match line {
            Err(err) => Some(Err(ReplayError::Io(err))),
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    return None;
                }
                Some(
                    serde_json::from_str(trimmed).map_err(|source| ReplayError::Parse {
                        line: index + 1,
                        source,
                    }),
                )
            }
        })
}

/// Decode a trace into events
///
/// # Errors
///
/// Fails on the first unreadable or malformed line.
pub fn read_trace(reader: impl BufRead) -> Result<Vec<TraceEvent>, ReplayError> {
    events(reader).collect()
}

/// Encode `events` as JSON lines
///
/// # Errors
///
/// Fails when the writer does.
pub fn write_trace<'a>(
    mut writer: impl Write,
    events: impl IntoIterator<Item = &'a TraceEvent>,
) -> Result<(), ReplayError> {
    for event in events {
        serde_json::to_writer(&mut writer, event)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Feed a trace to `detector`, line by line
///
/// Events are applied as they are decoded; a malformed line stops the replay
/// with every earlier event already applied. Returns the number of events.
///
/// # Errors
///
/// Fails on the first unreadable or malformed line.
pub fn replay<D: Detector + ?Sized>(detector: &D, reader: impl BufRead) -> Result<usize, ReplayError> {
    let mut applied = 0;
    for event in events(reader) {
        event?.apply(detector);
        applied += 1;
    }
    debug!(backend = detector.name(), events = applied, "trace replayed");
    Ok(applied)
}

/// What a replay found
#[derive(Debug, Clone)]
pub struct ReplayReport {
    /// Events applied
    pub events: usize,
    /// Races in report order
    pub races: Vec<Race>,
    /// Usage anomalies in report order
    pub anomalies: Vec<UsageAnomaly>,
    /// Engine counters at the end of the trace
    pub stats: StatsSnapshot,
}

impl ReplayReport {
    /// Check if the trace was race free
    pub fn is_clean(&self) -> bool {
        self.races.is_empty()
    }
}

/// Replay the trace at `path` through a fresh single-threaded engine
///
/// # Errors
///
/// Fails when the file cannot be opened or a line is malformed.
pub fn replay_file(path: impl AsRef<Path>, config: DetectorConfig) -> Result<ReplayReport, ReplayError> {
    let path = path.as_ref();
    let file = File::open(path)?;

    let races = Arc::new(Mutex::new(Vec::new()));
    let anomalies = Arc::new(Mutex::new(Vec::new()));

    let detector = ReplayFastTrack::builder()
        .config(config)
        .on_race({
            let races = Arc::clone(&races);
            move |race| races.lock().push(*race)
        })
        .on_anomaly({
            let anomalies = Arc::clone(&anomalies);
            move |anomaly| anomalies.lock().push(anomaly.clone())
        })
        .build();

    let events = replay(&detector, BufReader::new(file))?;
    let stats = detector.stats();
    detector.finalize();

    let report = ReplayReport {
        events,
        races: std::mem::take(&mut *races.lock()),
        anomalies: std::mem::take(&mut *anomalies.lock()),
        stats,
    };
    info!(
        path = %path.display(),
        events = report.events,
        races = report.races.len(),
        anomalies = report.anomalies.len(),
        "replay finished"
    );
    Ok(report)
}
