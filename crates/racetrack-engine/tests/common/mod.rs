//! Shared helpers for the integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use racetrack_core::{Race, RaceCallback, ThreadContext, ThreadId, UsageAnomaly};
use racetrack_engine::domain::{FastTrack, LockPolicy};
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

/// Route engine logs to the test harness output (`RUST_LOG` to filter)
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Collects everything a detector reports
#[derive(Clone, Default)]
pub struct Collector {
    races: Arc<Mutex<Vec<Race>>>,
    anomalies: Arc<Mutex<Vec<UsageAnomaly>>>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn race_callback(&self) -> RaceCallback {
        let races = Arc::clone(&self.races);
        Arc::new(move |race: &Race| races.lock().push(*race))
    }

    /// Engine with both callbacks wired to this collector
    pub fn engine<P: LockPolicy>(&self, args: &[&str]) -> FastTrack<P> {
        use racetrack_core::Detector;

        let anomalies = Arc::clone(&self.anomalies);
        let detector = FastTrack::<P>::default();
        detector.set_anomaly_callback(Some(Arc::new(move |a: &UsageAnomaly| {
            anomalies.lock().push(a.clone());
        })));
        assert!(detector.init(args, self.race_callback()));
        detector
    }

    pub fn races(&self) -> Vec<Race> {
        self.races.lock().clone()
    }

    pub fn anomalies(&self) -> Vec<UsageAnomaly> {
        self.anomalies.lock().clone()
    }
}

pub fn ctx(tid: u32) -> ThreadContext {
    ThreadContext::new(tid)
}

pub fn tid(id: u32) -> ThreadId {
    ThreadId::new(id)
}
