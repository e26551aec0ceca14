//! FastTrack Orchestrator
//!
//! Receives host events, updates thread, lock, shadow and allocation state,
//! and reports races through the registered callback.
//!
//! # Memory Layout
//! ```text
//! FastTrack<P>
//! ├─ threads:     Map<ThreadId, Arc<Lock<ThreadState>>>
//! ├─ retired:     Lock<HashSet<ThreadId>>
//! ├─ locks:       Map<lock id,  Arc<Lock<LockState>>>
//! ├─ signals:     Map<signal id, Arc<Lock<VectorClock>>>
//! ├─ shadow:      Map<address,  Arc<Lock<AccessHistory>>>
//! ├─ regions:     Lock<BTreeMap<start, end>>
//! ├─ allocations: Lock<AllocationTable>
//! ├─ freed_pages: Map<page, ()>
//! ├─ reporter:    race / anomaly callbacks
//! └─ stats:       atomic counters
//! ```
//!
//! Lock order: allocation table, then location or lock object, then thread.
//! The access path only consults the allocation table when `freed_pages`
//! holds the page of the address.
//!
//! Events are split by concern: `access` (read/write and the reuse boundary
//! check), `sync` (locks and signals), `threads` (lifecycle and call stacks),
//! `memory` (allocation and shadow regions).

mod access;
mod memory;
mod report;
mod settings;
mod stats;
mod sync;
mod threads;

pub use stats::{DetectorStats, StatsSnapshot};

use self::report::Reporter;
use self::settings::Settings;
use crate::domain::alloc::AllocationTable;
use crate::domain::clock::VectorClock;
use crate::domain::lock::LockState;
use crate::domain::policy::{ConcurrentPolicy, LockPolicy, ReplayPolicy, ShadowLock, ShadowMap};
use crate::domain::shadow::AccessHistory;
use crate::domain::thread::ThreadState;
use racetrack_core::{
    AnomalyCallback, Detector, DetectorConfig, DetectorError, Race, RaceCallback, ThreadContext,
    ThreadId, UsageAnomaly,
};
use std::collections::{BTreeMap, HashSet};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Shared handle to one entity under the policy's lock
pub type Handle<P, T> = Arc<<P as LockPolicy>::Lock<T>>;

fn lock<P: LockPolicy, T>(value: T) -> P::Lock<T> {
    <P::Lock<T> as ShadowLock<T>>::new(value)
}

fn handle<P: LockPolicy, T>(value: T) -> Handle<P, T> {
    Arc::new(lock::<P, T>(value))
}

/// Backend name reported through `Detector::name`
pub const NAME: &str = "FastTrack";

/// Vector-clock race detector
///
/// # Type Parameters
///
/// - `P`: locking policy. `ConcurrentPolicy` for live monitoring of a
///   multithreaded program, `ReplayPolicy` for single-threaded trace replay.
pub struct FastTrack<P: LockPolicy = ConcurrentPolicy> {
    settings: Settings,
    config: P::Lock<DetectorConfig>,
    active: AtomicBool,
    threads: P::Map<ThreadId, Handle<P, ThreadState>>,
    retired: P::Lock<HashSet<ThreadId>>,
    locks: P::Map<usize, Handle<P, LockState>>,
    signals: P::Map<usize, Handle<P, VectorClock>>,
    shadow: P::Map<usize, Handle<P, AccessHistory>>,
    mapped: AtomicBool,
    regions: P::Lock<BTreeMap<usize, usize>>,
    allocations: P::Lock<AllocationTable>,
    freed_pages: P::Map<usize, ()>,
    reporter: Reporter<P>,
    stats: DetectorStats,
}

/// Live-monitoring detector
pub type ConcurrentFastTrack = FastTrack<ConcurrentPolicy>;

/// Trace-replay detector (`!Sync`)
pub type ReplayFastTrack = FastTrack<ReplayPolicy>;

impl<P: LockPolicy> FastTrack<P> {
    /// Create a detector with `config`
    ///
    /// Events are accepted right away; races are only logged until a callback
    /// is registered through `init` or the builder.
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            settings: Settings::new(&config),
            allocations: lock::<P, _>(AllocationTable::new(config.max_freed_allocations)),
            config: lock::<P, _>(config),
            active: AtomicBool::new(false),
            threads: Default::default(),
            retired: lock::<P, _>(HashSet::new()),
            locks: Default::default(),
            signals: Default::default(),
            shadow: Default::default(),
            mapped: AtomicBool::new(false),
            regions: lock::<P, _>(BTreeMap::new()),
            freed_pages: Default::default(),
            reporter: Reporter::new(),
            stats: DetectorStats::new(),
        }
    }

    /// Start a builder
    pub fn builder() -> FastTrackBuilder<P> {
        FastTrackBuilder::new()
    }

    /// Current configuration
    pub fn config(&self) -> DetectorConfig {
        self.config.read(Clone::clone)
    }

    /// Counter snapshot
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Number of live (not yet retired) threads
    pub fn live_threads(&self) -> usize {
        self.threads.len()
    }

    /// Number of memory locations with shadow state
    pub fn tracked_locations(&self) -> usize {
        self.shadow.len()
    }

    /// Number of lock objects seen
    pub fn tracked_locks(&self) -> usize {
        self.locks.len()
    }

    /// Number of live and retained freed heap blocks
    pub fn tracked_allocations(&self) -> (usize, usize) {
        self.allocations.read(|a| (a.live_len(), a.freed_len()))
    }

    /// Register the anomaly sink
    pub fn set_anomaly_callback(&self, callback: Option<AnomalyCallback>) {
        self.reporter.set_anomaly(callback);
    }

    fn configure(&self, config: DetectorConfig) {
        self.settings.apply(&config);
        self.allocations
            .write(|a| a.set_max_freed(config.max_freed_allocations));
        self.config.write(|c| *c = config);
    }

    fn teardown(&self) {
        self.threads.clear();
        self.retired.write(HashSet::clear);
        self.locks.clear();
        self.signals.clear();
        self.shadow.clear();
        self.regions.write(BTreeMap::clear);
        self.mapped.store(false, Ordering::Relaxed);
        self.allocations.write(AllocationTable::clear);
        self.freed_pages.clear();
    }
}

impl<P: LockPolicy> Default for FastTrack<P> {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl<P: LockPolicy> Detector for FastTrack<P> {
    fn init(&self, args: &[&str], callback: RaceCallback) -> bool {
        let mut config = self.config();
        if let Err(err) = config.apply_args(args) {
            error!(%err, "rejecting detector arguments");
            return false;
        }

        self.teardown();
        self.configure(config);
        self.stats.reset();
        self.reporter.set_race(Some(callback));
        self.active.store(true, Ordering::Release);

        info!(
            name = NAME,
            version = self.version(),
            policy = P::NAME,
            config = ?self.config(),
            "detector initialized"
        );
        true
    }

    fn finalize(&self) {
        let live = self
            .threads
            .values()
            .iter()
            .filter(|t| t.read(|t| t.parent().is_some()))
            .count();
        if live > 0 {
            let err = DetectorError::LiveThreadsAtFinalize(live);
            error!(%err, "tearing down anyway");
        }

        self.teardown();
        self.reporter.set_race(None);

        if self.active.swap(false, Ordering::AcqRel) {
            info!(stats = ?self.stats(), "detector finalized");
        }
    }

    fn map_shadow(&self, start: usize, size: usize) {
        self.on_map_shadow(start, size);
    }

    fn read(&self, ctx: ThreadContext, pc: usize, addr: usize, size: usize) {
        self.on_access(ctx.tid(), pc, addr, size, false);
    }

    fn write(&self, ctx: ThreadContext, pc: usize, addr: usize, size: usize) {
        self.on_access(ctx.tid(), pc, addr, size, true);
    }

    fn allocate(&self, ctx: ThreadContext, pc: usize, addr: usize, size: usize) {
        self.on_allocate(ctx.tid(), pc, addr, size);
    }

    fn deallocate(&self, ctx: ThreadContext, addr: usize) {
        self.on_deallocate(ctx.tid(), addr);
    }

    fn acquire(&self, ctx: ThreadContext, lock: usize, recursive: bool, is_write: bool) {
        self.on_acquire(ctx.tid(), lock, recursive, is_write);
    }

    fn release(&self, ctx: ThreadContext, lock: usize, is_write: bool) {
        self.on_release(ctx.tid(), lock, is_write);
    }

    fn happens_before(&self, ctx: ThreadContext, id: usize) {
        self.on_happens_before(ctx.tid(), id);
    }

    fn happens_after(&self, ctx: ThreadContext, id: usize) {
        self.on_happens_after(ctx.tid(), id);
    }

    fn fork(&self, parent: ThreadContext, child: ThreadId) -> ThreadContext {
        self.on_fork(parent.tid(), child);
        ThreadContext::from(child)
    }

    fn join(&self, parent: ThreadContext, child: ThreadId) {
        self.on_join(parent.tid(), child);
    }

    fn detach(&self, ctx: ThreadContext, tid: ThreadId) {
        self.on_detach(ctx.tid(), tid);
    }

    fn finish(&self, ctx: ThreadContext, tid: ThreadId) {
        self.on_finish(ctx.tid(), tid);
    }

    fn func_enter(&self, ctx: ThreadContext, pc: usize) {
        self.on_func_enter(ctx.tid(), pc);
    }

    fn func_exit(&self, ctx: ThreadContext) {
        self.on_func_exit(ctx.tid());
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

/// Builder for `FastTrack`
///
/// # Example
///
/// ```rust
/// use racetrack_engine::domain::ConcurrentFastTrack;
/// use racetrack_core::DetectorConfig;
///
/// let detector = ConcurrentFastTrack::builder()
///     .config(DetectorConfig::builder().stack_size(8).build())
///     .on_race(|race| eprintln!("{race}"))
///     .build();
/// assert_eq!(detector.config().max_stack_size, 8);
/// ```
pub struct FastTrackBuilder<P: LockPolicy = ConcurrentPolicy> {
    config: DetectorConfig,
    on_race: Option<RaceCallback>,
    on_anomaly: Option<AnomalyCallback>,
    _policy: PhantomData<P>,
}

impl<P: LockPolicy> FastTrackBuilder<P> {
    /// Builder with the default configuration
    pub fn new() -> Self {
        Self {
            config: DetectorConfig::default(),
            on_race: None,
            on_anomaly: None,
            _policy: PhantomData,
        }
    }

    /// Set the configuration
    #[must_use]
    pub fn config(mut self, config: DetectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the race callback
    #[must_use]
    pub fn on_race(mut self, callback: impl Fn(&Race) + Send + Sync + 'static) -> Self {
        self.on_race = Some(Arc::new(callback));
        self
    }

    /// Set the usage anomaly callback
    #[must_use]
    pub fn on_anomaly(
        mut self,
        callback: impl Fn(&UsageAnomaly) + Send + Sync + 'static,
    ) -> Self {
        self.on_anomaly = Some(Arc::new(callback));
        self
    }

    /// Build the detector
    ///
    /// With a race callback the detector starts initialized, as if `init`
    /// had been called with no arguments.
    pub fn build(self) -> FastTrack<P> {
        let detector = FastTrack::new(self.config);
        detector.reporter.set_anomaly(self.on_anomaly);
        if let Some(callback) = self.on_race {
            detector.init(&[], callback);
        }
        detector
    }
}

impl<P: LockPolicy> Default for FastTrackBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}
