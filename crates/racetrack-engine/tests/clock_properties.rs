//! Property tests for the vector-clock algebra and lock-ordered histories

mod common;

use common::{ctx, init_test_logging, tid, Collector};
use proptest::prelude::*;
use racetrack_core::{Detector, ThreadId};
use racetrack_engine::domain::ReplayPolicy;
use racetrack_engine::{Epoch, VectorClock};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_clock() -> impl Strategy<Value = VectorClock> {
    prop::collection::vec((0u32..8, 0u32..50), 0..6).prop_map(|components| {
        components
            .into_iter()
            .map(|(t, c)| (ThreadId::new(t), c))
            .collect()
    })
}

/// (thread, address slot, is_write) steps for a small program
fn arb_program() -> impl Strategy<Value = Vec<(u32, usize, bool)>> {
    prop::collection::vec((2u32..5, 0usize..4, any::<bool>()), 1..60)
}

// ============================================================================
// Clock Algebra
// ============================================================================

proptest! {
    #[test]
    fn join_is_commutative(a in arb_clock(), b in arb_clock()) {
        prop_assert_eq!(a.joined(&b), b.joined(&a));
    }

    #[test]
    fn join_is_associative(a in arb_clock(), b in arb_clock(), c in arb_clock()) {
        prop_assert_eq!(a.joined(&b).joined(&c), a.joined(&b.joined(&c)));
    }

    #[test]
    fn join_is_idempotent(a in arb_clock()) {
        prop_assert_eq!(a.joined(&a), a);
    }

    #[test]
    fn operands_precede_join(a in arb_clock(), b in arb_clock()) {
        let j = a.joined(&b);
        prop_assert!(a.happens_before(&j));
        prop_assert!(b.happens_before(&j));
    }

    #[test]
    fn happens_before_is_reflexive(a in arb_clock()) {
        prop_assert!(a.happens_before(&a));
        prop_assert!(!a.concurrent(&a));
    }

    #[test]
    fn happens_before_is_antisymmetric(a in arb_clock(), b in arb_clock()) {
        if a.happens_before(&b) && b.happens_before(&a) {
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn epoch_test_matches_component(a in arb_clock(), t in 0u32..8, c in 0u32..50) {
        let epoch = Epoch::new(ThreadId::new(t), c);
        prop_assert_eq!(epoch.happens_before(&a), c <= a.get(ThreadId::new(t)));
    }

    #[test]
    fn increment_moves_strictly_forward(a in arb_clock(), t in 0u32..8) {
        let mut next = a.clone();
        next.increment(ThreadId::new(t));
        prop_assert!(a.happens_before(&next));
        prop_assert!(!next.happens_before(&a));
    }
}

// ============================================================================
// Engine Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any program whose every access sits inside one global lock is race free
    #[test]
    fn globally_locked_programs_never_race(program in arb_program()) {
        init_test_logging();
        let c = Collector::new();
        let d = c.engine::<ReplayPolicy>(&[]);
        for t in 2..5 {
            d.fork(ctx(1), tid(t));
        }
        for (step, &(t, slot, write)) in program.iter().enumerate() {
            let me = ctx(t);
            d.acquire(me, 0x1, false, true);
            if write {
                d.write(me, step, 0x100 + slot * 8, 8);
            } else {
                d.read(me, step, 0x100 + slot * 8, 8);
            }
            d.release(me, 0x1, true);
        }
        prop_assert!(c.races().is_empty());
    }

    /// Read-only programs never race, locked or not
    #[test]
    fn read_only_programs_never_race(program in arb_program()) {
        let c = Collector::new();
        let d = c.engine::<ReplayPolicy>(&[]);
        d.write(ctx(1), 0, 0x100, 8);
        for t in 2..5 {
            d.fork(ctx(1), tid(t));
        }
        for (step, &(t, slot, _)) in program.iter().enumerate() {
            d.read(ctx(t), step, 0x100 + (slot % 2) * 8, 8);
        }
        prop_assert!(c.races().is_empty());
    }

    /// Unsynchronized writers on one slot race at least once whenever two
    /// distinct threads write it
    #[test]
    fn distinct_unsynchronized_writers_race(program in arb_program()) {
        let c = Collector::new();
        let d = c.engine::<ReplayPolicy>(&[]);
        for t in 2..5 {
            d.fork(ctx(1), tid(t));
        }
        let mut writers = std::collections::BTreeSet::new();
        for (step, &(t, _, _)) in program.iter().enumerate() {
            d.write(ctx(t), step, 0x100, 8);
            writers.insert(t);
        }
        prop_assert_eq!(!c.races().is_empty(), writers.len() > 1);
    }
}
