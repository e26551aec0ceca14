//! Kani Proofs for the clock algebra
//!
//! Bounded harnesses over clocks of at most three components, enough to
//! cover disjoint, overlapping and identical thread sets.

#[cfg(kani)]
mod kani_proofs {
    use super::super::*;
    use racetrack_core::ThreadId;

    fn any_clock() -> VectorClock {
        let mut vc = VectorClock::new();
        for tid in 0..3u32 {
            let c: u32 = kani::any();
            kani::assume(c < 8);
            vc.set(ThreadId::new(tid), c);
        }
        vc
    }

    /// Join is commutative
    #[kani::proof]
    #[kani::unwind(8)]
    fn verify_join_commutative() {
        let a = any_clock();
        let b = any_clock();
        assert_eq!(a.joined(&b), b.joined(&a));
    }

    /// Both operands are ordered before their join
    #[kani::proof]
    #[kani::unwind(8)]
    fn verify_join_upper_bound() {
        let a = any_clock();
        let b = any_clock();
        let j = a.joined(&b);
        assert!(a.happens_before(&j));
        assert!(b.happens_before(&j));
    }

    /// Increment strictly advances the component
    #[kani::proof]
    #[kani::unwind(8)]
    fn verify_increment_monotonic() {
        let mut a = any_clock();
        let before = a.get(ThreadId::new(1));
        let after = a.increment(ThreadId::new(1));
        assert!(after > before);
    }

    /// Epoch packing is lossless
    #[kani::proof]
    fn verify_epoch_roundtrip() {
        let tid: u32 = kani::any();
        let clock: u32 = kani::any();
        let e = Epoch::new(ThreadId::new(tid), clock);
        assert_eq!(e.tid().as_u32(), tid);
        assert_eq!(e.clock(), clock);
    }
}
