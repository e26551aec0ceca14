//! Detection Scenarios
//!
//! Every scenario runs against both locking policies; the engines must agree.

mod common;

use common::{ctx, init_test_logging, tid, Collector};
use racetrack_core::{Detector, RaceKind, UsageAnomaly};
use racetrack_engine::domain::{FastTrack, LockPolicy};

const L: usize = 0x10C0;

fn unsynchronized_writes<P: LockPolicy>() {
    init_test_logging();
    let c = Collector::new();
    let d = c.engine::<P>(&[]);

    d.fork(ctx(1), tid(2));
    d.write(ctx(1), 1, 0x100, 8);
    d.write(ctx(2), 2, 0x100, 8);

    let races = c.races();
    assert_eq!(races.len(), 1);
    let race = races[0];
    assert_eq!(race.kind, RaceKind::WriteWrite);
    assert_eq!((race.first.pc, race.second.pc), (1, 2));
    assert_eq!((race.first.thread_id, race.second.thread_id), (1, 2));
    assert_eq!(race.first.accessed_memory, 0x100);
    assert!(race.first.write && race.second.write);
}

fn lock_protected_accesses<P: LockPolicy>() {
    init_test_logging();
    let c = Collector::new();
    let d = c.engine::<P>(&[]);

    d.fork(ctx(1), tid(2));
    d.acquire(ctx(1), L, false, true);
    d.write(ctx(1), 1, 0x200, 8);
    d.release(ctx(1), L, true);
    d.acquire(ctx(2), L, false, true);
    d.read(ctx(2), 2, 0x200, 8);
    d.release(ctx(2), L, true);

    assert!(c.races().is_empty());
}

fn repeated_conflict_reported_once<P: LockPolicy>() {
    let c = Collector::new();
    let d = c.engine::<P>(&[]);

    d.fork(ctx(1), tid(2));
    d.write(ctx(1), 1, 0x100, 8);
    d.write(ctx(2), 2, 0x100, 8);
    d.write(ctx(2), 3, 0x100, 8);
    d.read(ctx(2), 4, 0x100, 8);

    assert_eq!(c.races().len(), 1);
}

fn concurrent_reads_never_race<P: LockPolicy>() {
    let c = Collector::new();
    let d = c.engine::<P>(&[]);

    d.write(ctx(1), 1, 0x100, 8);
    d.fork(ctx(1), tid(2));
    d.fork(ctx(1), tid(3));
    d.read(ctx(2), 2, 0x100, 8);
    d.read(ctx(3), 3, 0x100, 8);
    d.read(ctx(1), 4, 0x100, 8);

    assert!(c.races().is_empty());
}

fn read_then_unordered_write<P: LockPolicy>() {
    let c = Collector::new();
    let d = c.engine::<P>(&[]);

    d.fork(ctx(1), tid(2));
    d.read(ctx(1), 1, 0x100, 8);
    d.write(ctx(2), 2, 0x100, 8);

    let races = c.races();
    assert_eq!(races.len(), 1);
    assert_eq!(races[0].kind, RaceKind::ReadWrite);
    assert!(!races[0].first.write);
}

fn write_then_unordered_read<P: LockPolicy>() {
    let c = Collector::new();
    let d = c.engine::<P>(&[]);

    d.fork(ctx(1), tid(2));
    d.write(ctx(1), 1, 0x100, 8);
    d.read(ctx(2), 2, 0x100, 8);

    let races = c.races();
    assert_eq!(races.len(), 1);
    assert_eq!(races[0].kind, RaceKind::WriteRead);
}

fn shared_readers_then_exclusive_writer<P: LockPolicy>() {
    let c = Collector::new();
    let d = c.engine::<P>(&[]);

    d.fork(ctx(1), tid(2));
    d.fork(ctx(1), tid(3));
    for reader in [2, 3] {
        d.acquire(ctx(reader), L, false, false);
        d.read(ctx(reader), 10 + reader as usize, 0x100, 8);
        d.release(ctx(reader), L, false);
    }
    d.acquire(ctx(1), L, false, true);
    d.write(ctx(1), 20, 0x100, 8);
    d.release(ctx(1), L, true);

    assert!(c.races().is_empty());
}

fn shared_reader_unordered_with_writer<P: LockPolicy>() {
    let c = Collector::new();
    let d = c.engine::<P>(&[]);

    d.fork(ctx(1), tid(2));
    d.fork(ctx(1), tid(3));
    d.read(ctx(2), 2, 0x100, 8);
    d.read(ctx(3), 3, 0x100, 8);
    d.join(ctx(1), tid(2));
    // T3's read is still unordered
    d.write(ctx(1), 4, 0x100, 8);

    let races = c.races();
    assert_eq!(races.len(), 1);
    assert_eq!(races[0].kind, RaceKind::ReadWrite);
    assert_eq!(races[0].first.thread_id, 3);
}

fn fork_join_orders_everything<P: LockPolicy>() {
    let c = Collector::new();
    let d = c.engine::<P>(&[]);

    d.write(ctx(1), 1, 0x100, 8);
    let worker = d.fork(ctx(1), tid(2));
    d.write(worker, 2, 0x100, 8);
    d.join(ctx(1), tid(2));
    d.write(ctx(1), 3, 0x100, 8);

    assert!(c.races().is_empty());
    assert!(c.anomalies().is_empty());
}

fn use_after_free_across_reuse<P: LockPolicy>() {
    let c = Collector::new();
    let d = c.engine::<P>(&[]);

    d.fork(ctx(1), tid(2));
    d.allocate(ctx(1), 0xA1, 0x300, 8);
    d.write(ctx(1), 0x11, 0x300, 8);
    d.deallocate(ctx(1), 0x300);
    d.allocate(ctx(2), 0xA2, 0x300, 8);
    d.write(ctx(2), 0x22, 0x300, 8);

    let races = c.races();
    assert_eq!(races.len(), 1);
    let race = races[0];
    assert_eq!(race.kind, RaceKind::UseAfterFree);
    assert_eq!((race.first.thread_id, race.first.pc), (1, 0x11));
    assert_eq!((race.second.thread_id, race.second.pc), (2, 0x22));
    assert!(race.first.on_heap);
    assert_eq!(race.first.heap_block_begin, 0x300);
    assert_eq!(race.first.heap_block_size, 8);

    // reported once per thread and address
    d.write(ctx(2), 0x23, 0x300, 8);
    assert_eq!(c.races().len(), 1);
}

fn reuse_ordered_through_lock<P: LockPolicy>() {
    let c = Collector::new();
    let d = c.engine::<P>(&[]);

    d.fork(ctx(1), tid(2));
    d.acquire(ctx(1), L, false, true);
    d.allocate(ctx(1), 0xA1, 0x300, 8);
    d.write(ctx(1), 0x11, 0x300, 8);
    d.deallocate(ctx(1), 0x300);
    d.release(ctx(1), L, true);

    d.acquire(ctx(2), L, false, true);
    d.allocate(ctx(2), 0xA2, 0x300, 8);
    d.write(ctx(2), 0x22, 0x300, 8);
    d.release(ctx(2), L, true);

    assert!(c.races().is_empty());
}

fn use_after_free_before_reuse<P: LockPolicy>() {
    let c = Collector::new();
    let d = c.engine::<P>(&[]);

    d.fork(ctx(1), tid(2));
    d.allocate(ctx(1), 0xA0, 0x300, 8);
    d.write(ctx(1), 0x11, 0x304, 4);
    d.deallocate(ctx(1), 0x300);
    d.write(ctx(2), 0x22, 0x304, 4);

    let races = c.races();
    assert_eq!(races.len(), 1);
    let race = races[0];
    assert_eq!(race.kind, RaceKind::UseAfterFree);
    assert_eq!((race.first.thread_id, race.first.pc), (1, 0x11));
    assert_eq!(race.first.accessed_memory, 0x304);
    assert_eq!(race.first.access_size, 4);
    assert_eq!(race.first.heap_block_begin, 0x300);
    assert_eq!((race.second.thread_id, race.second.pc), (2, 0x22));
}

/// T1 frees under L, T2 reallocates under L, T3 never takes L
fn free_and_reuse_under_lock<P: LockPolicy>(d: &FastTrack<P>) {
    d.fork(ctx(1), tid(2));
    d.fork(ctx(1), tid(3));
    d.allocate(ctx(1), 0xA1, 0x300, 8);
    d.write(ctx(1), 0x11, 0x300, 8);
    d.acquire(ctx(1), L, false, true);
    d.deallocate(ctx(1), 0x300);
    d.release(ctx(1), L, true);

    d.acquire(ctx(2), L, false, true);
    d.allocate(ctx(2), 0xA2, 0x300, 8);
    d.write(ctx(2), 0x22, 0x300, 8);
    d.release(ctx(2), L, true);
}

fn reuse_flags_thread_that_missed_free<P: LockPolicy>() {
    let c = Collector::new();
    let d = c.engine::<P>(&[]);
    free_and_reuse_under_lock(&d);

    d.write(ctx(3), 0x33, 0x300, 8);

    let races = c.races();
    assert_eq!(races.len(), 1, "one report, not a second one against T2");
    let race = races[0];
    assert_eq!(race.kind, RaceKind::UseAfterFree);
    assert_eq!((race.first.thread_id, race.first.pc), (1, 0x11));
    assert_eq!((race.second.thread_id, race.second.pc), (3, 0x33));
}

fn reuse_spares_thread_ordered_after_free<P: LockPolicy>() {
    let c = Collector::new();
    let d = c.engine::<P>(&[]);
    free_and_reuse_under_lock(&d);

    d.acquire(ctx(3), L, false, true);
    d.write(ctx(3), 0x33, 0x300, 8);
    d.release(ctx(3), L, true);

    assert!(c.races().is_empty());
}

fn block_owner_is_exempt<P: LockPolicy>() {
    let c = Collector::new();
    let d = c.engine::<P>(&[]);

    d.allocate(ctx(1), 0xA1, 0x300, 8);
    d.write(ctx(1), 0x11, 0x300, 8);
    d.fork(ctx(1), tid(2));
    d.fork(ctx(1), tid(3));
    d.deallocate(ctx(2), 0x300);

    // neither thread observed T2's free; only the non-owner is flagged
    d.write(ctx(1), 0x12, 0x300, 8);
    assert!(c.races().is_empty());
    d.write(ctx(3), 0x33, 0x304, 4);

    let races = c.races();
    assert_eq!(races.len(), 1);
    assert_eq!(races[0].kind, RaceKind::UseAfterFree);
    assert_eq!(races[0].second.thread_id, 3);
    // nothing recorded at 0x304: blamed on the allocation site
    assert_eq!((races[0].first.pc, races[0].first.accessed_memory), (0xA1, 0x300));
}

fn anomalies_do_not_disturb_detection<P: LockPolicy>() {
    let c = Collector::new();
    let d = c.engine::<P>(&[]);

    d.fork(ctx(1), tid(2));
    d.release(ctx(1), L, true);
    d.deallocate(ctx(1), 0xDEAD);
    d.write(ctx(1), 1, 0x100, 8);
    d.write(ctx(2), 2, 0x100, 8);

    assert_eq!(c.races().len(), 1);
    assert_eq!(
        c.anomalies(),
        vec![
            UsageAnomaly::ReleaseWithoutAcquire {
                thread: tid(1),
                lock: L
            },
            UsageAnomaly::UnknownAllocation {
                thread: tid(1),
                addr: 0xDEAD
            },
        ]
    );
}

macro_rules! for_both_policies {
    ($($scenario:ident),* $(,)?) => {
        mod concurrent {
            use racetrack_engine::domain::ConcurrentPolicy;
            $(
                #[test]
                fn $scenario() {
                    super::$scenario::<ConcurrentPolicy>();
                }
            )*
        }

        mod replay {
            use racetrack_engine::domain::ReplayPolicy;
            $(
                #[test]
                fn $scenario() {
                    super::$scenario::<ReplayPolicy>();
                }
            )*
        }
    };
}

for_both_policies!(
    unsynchronized_writes,
    lock_protected_accesses,
    repeated_conflict_reported_once,
    concurrent_reads_never_race,
    read_then_unordered_write,
    write_then_unordered_read,
    shared_readers_then_exclusive_writer,
    shared_reader_unordered_with_writer,
    fork_join_orders_everything,
    use_after_free_across_reuse,
    reuse_ordered_through_lock,
    use_after_free_before_reuse,
    reuse_flags_thread_that_missed_free,
    reuse_spares_thread_ordered_after_free,
    block_owner_is_exempt,
    anomalies_do_not_disturb_detection,
);
