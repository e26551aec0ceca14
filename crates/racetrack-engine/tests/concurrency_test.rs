//! Real Threads Against the Concurrent Engine
//!
//! The host protocol is followed literally: `fork` is announced before the
//! OS thread starts, `join` after it has been joined, and lock events are
//! emitted while the real lock is held.

mod common;

use common::{ctx, init_test_logging, tid, Collector};
use parking_lot::Mutex;
use racetrack_core::{Detector, RaceKind, ThreadContext};
use racetrack_engine::ConcurrentFastTrack;
use std::sync::Arc;
use std::thread;

const WORKERS: u32 = 4;
const ITERATIONS: usize = 500;
const SHARED: usize = 0x1000;
const LOCK: usize = 0xBEEF;

fn spawn_workers<F>(detector: &Arc<ConcurrentFastTrack>, body: F)
where
    F: Fn(&ConcurrentFastTrack, ThreadContext) + Send + Sync + 'static,
{
    let main = ctx(1);
    let body = Arc::new(body);
    let handles: Vec<_> = (2..2 + WORKERS)
        .map(|id| {
            let worker = detector.fork(main, tid(id));
            let detector = Arc::clone(detector);
            let body = Arc::clone(&body);
            thread::spawn(move || body(&detector, worker))
        })
        .collect();

    for (id, handle) in (2..2 + WORKERS).zip(handles) {
        handle.join().expect("worker panicked");
        detector.join(main, tid(id));
    }
}

#[test]
fn test_mutex_protected_writes_do_not_race() {
    init_test_logging();
    let c = Collector::new();
    let detector: Arc<ConcurrentFastTrack> = Arc::new(c.engine(&[]));
    let mutex = Arc::new(Mutex::new(0u64));

    spawn_workers(&detector, move |d, me| {
        for i in 0..ITERATIONS {
            let mut guard = mutex.lock();
            d.acquire(me, LOCK, false, true);
            d.read(me, 0x10, SHARED, 8);
            *guard += 1;
            d.write(me, 0x14, SHARED, 8);
            d.release(me, LOCK, true);
            drop(guard);

            // thread-private scratch
            let private = 0x10_0000 * me.tid().as_usize() + (i % 16) * 8;
            d.write(me, 0x18, private, 8);
        }
    });

    // everything is ordered before main after the joins
    detector.read(ctx(1), 0x20, SHARED, 8);

    assert!(c.races().is_empty(), "unexpected races: {:?}", c.races());
    assert!(c.anomalies().is_empty());
    assert_eq!(detector.live_threads(), 1);
    let stats = detector.stats();
    assert_eq!(stats.writes, u64::from(WORKERS) * ITERATIONS as u64 * 2);
}

#[test]
fn test_unsynchronized_writes_race() {
    init_test_logging();
    let c = Collector::new();
    let detector: Arc<ConcurrentFastTrack> = Arc::new(c.engine(&[]));

    spawn_workers(&detector, |d, me| {
        for _ in 0..ITERATIONS {
            d.write(me, 0x30, SHARED, 8);
        }
    });

    let races = c.races();
    assert!(!races.is_empty());
    for race in &races {
        assert_eq!(race.kind, RaceKind::WriteWrite);
        assert_ne!(race.first.thread_id, race.second.thread_id);
        assert_eq!(race.second.accessed_memory, SHARED);
    }
}

#[test]
fn test_signal_handoff_orders_threads() {
    init_test_logging();
    let c = Collector::new();
    let detector: Arc<ConcurrentFastTrack> = Arc::new(c.engine(&[]));
    let main = ctx(1);
    let producer = detector.fork(main, tid(2));
    let consumer = detector.fork(main, tid(3));
    let (tx, rx) = std::sync::mpsc::channel::<()>();

    let d = Arc::clone(&detector);
    let produce = thread::spawn(move || {
        d.write(producer, 0x40, SHARED, 8);
        d.happens_before(producer, 0x77);
        tx.send(()).expect("consumer gone");
    });
    let d = Arc::clone(&detector);
    let consume = thread::spawn(move || {
        rx.recv().expect("producer gone");
        d.happens_after(consumer, 0x77);
        d.read(consumer, 0x44, SHARED, 8);
        d.write(consumer, 0x48, SHARED, 8);
    });

    produce.join().expect("producer panicked");
    consume.join().expect("consumer panicked");
    detector.join(main, tid(2));
    detector.join(main, tid(3));

    assert!(c.races().is_empty());
}

#[test]
fn test_heap_reuse_across_threads() {
    init_test_logging();
    let c = Collector::new();
    let detector: Arc<ConcurrentFastTrack> = Arc::new(c.engine(&[]));
    let main = ctx(1);
    let worker = detector.fork(main, tid(2));

    let d = Arc::clone(&detector);
    thread::spawn(move || {
        d.allocate(worker, 0x50, 0x8000, 64);
        d.write(worker, 0x54, 0x8010, 8);
        d.deallocate(worker, 0x8000);
    })
    .join()
    .expect("worker panicked");

    // main never joined the worker, so the free is unordered with it
    detector.allocate(main, 0x60, 0x8000, 64);
    detector.write(main, 0x64, 0x8010, 8);

    let races = c.races();
    assert_eq!(races.len(), 1);
    assert_eq!(races[0].kind, RaceKind::UseAfterFree);
    assert_eq!(races[0].first.pc, 0x54);
}
