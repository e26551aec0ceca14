//! Detector Benchmark Suite
//!
//! # Scenarios
//!
//! 1. **Same-epoch fast path**: one thread hammering the same location
//!    - Measures the floor cost of an access event
//!
//! 2. **Alternating ordered accesses**: two threads handing a location over
//!    through a lock
//!    - Exercises acquire/release plus the full history check
//!
//! 3. **Shared readers**: many threads reading one location
//!    - Exercises the shared read state
//!
//! 4. **Policy comparison**: the same single-threaded workload on the
//!    concurrent and replay engines

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use racetrack_core::{Detector, DetectorConfig, Race, ThreadContext, ThreadId};
use racetrack_engine::domain::{FastTrack, LockPolicy};
use racetrack_engine::{ConcurrentFastTrack, ReplayFastTrack};
use std::sync::Arc;

const EVENTS: usize = 1_000;

fn engine<P: LockPolicy>() -> FastTrack<P> {
    let detector = FastTrack::<P>::new(DetectorConfig::default());
    let initialized = detector.init(&[], Arc::new(|race: &Race| {
        black_box(race);
    }));
    assert!(initialized);
    detector
}

fn ctx(tid: u32) -> ThreadContext {
    ThreadContext::new(tid)
}

// ============================================================================
// Hot Path
// ============================================================================

fn bench_same_epoch(c: &mut Criterion) {
    let mut group = c.benchmark_group("same_epoch");
    group.throughput(Throughput::Elements(EVENTS as u64));

    group.bench_function("write", |b| {
        let detector: ConcurrentFastTrack = engine();
        let me = ctx(1);
        b.iter(|| {
            for i in 0..EVENTS {
                detector.write(me, black_box(i), black_box(0x1000), 8);
            }
        });
    });

    group.bench_function("read", |b| {
        let detector: ConcurrentFastTrack = engine();
        let me = ctx(1);
        b.iter(|| {
            for i in 0..EVENTS {
                detector.read(me, black_box(i), black_box(0x1000), 8);
            }
        });
    });

    group.finish();
}

fn bench_lock_handoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("lock_handoff");
    group.throughput(Throughput::Elements(EVENTS as u64));

    group.bench_function("two_threads", |b| {
        let detector: ConcurrentFastTrack = engine();
        let main = ctx(1);
        let worker = detector.fork(main, ThreadId::new(2));
        b.iter(|| {
            for i in 0..EVENTS {
                let me = if i % 2 == 0 { main } else { worker };
                detector.acquire(me, 0xA, false, true);
                detector.read(me, i, 0x2000, 8);
                detector.write(me, i, 0x2000, 8);
                detector.release(me, 0xA, true);
            }
        });
    });

    group.finish();
}

fn bench_shared_readers(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_readers");

    for readers in [2u32, 8, 32] {
        group.throughput(Throughput::Elements(EVENTS as u64));
        group.bench_with_input(BenchmarkId::from_parameter(readers), &readers, |b, &readers| {
            let detector: ConcurrentFastTrack = engine();
            let main = ctx(1);
            detector.write(main, 0, 0x3000, 8);
            let threads: Vec<_> = (2..2 + readers)
                .map(|t| detector.fork(main, ThreadId::new(t)))
                .collect();
            b.iter(|| {
                for (i, &reader) in threads.iter().cycle().take(EVENTS).enumerate() {
                    detector.read(reader, i, 0x3000, 8);
                }
            });
        });
    }

    group.finish();
}

// ============================================================================
// Policy Comparison
// ============================================================================

fn run_workload<D: Detector>(detector: &D, threads: &[ThreadContext]) {
    for i in 0..EVENTS {
        let me = threads[i % threads.len()];
        let addr = 0x4000 + (i % 64) * 8;
        detector.acquire(me, 0xB, false, true);
        detector.write(me, i, addr, 8);
        detector.release(me, 0xB, true);
        detector.read(me, i, 0x8000 + me.tid().as_usize() * 8, 8);
    }
}

fn bench_policies(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy");
    group.throughput(Throughput::Elements(EVENTS as u64));

    group.bench_function("concurrent", |b| {
        let detector: ConcurrentFastTrack = engine();
        let threads: Vec<_> = (2..6).map(|t| detector.fork(ctx(1), ThreadId::new(t))).collect();
        b.iter(|| run_workload(&detector, &threads));
    });

    group.bench_function("replay", |b| {
        let detector: ReplayFastTrack = engine();
        let threads: Vec<_> = (2..6).map(|t| detector.fork(ctx(1), ThreadId::new(t))).collect();
        b.iter(|| run_workload(&detector, &threads));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_same_epoch,
    bench_lock_handoff,
    bench_shared_readers,
    bench_policies
);
criterion_main!(benches);
