//! Hot-path view of the configuration
//!
//! The access path must not take a lock just to read the configuration, so
//! the values it needs are mirrored into atomics at `init`.

use racetrack_core::config::at_capacity;
use racetrack_core::{DetectorConfig, DetectorError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::warn;

/// Entity kinds subject to a capacity limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resource {
    Threads,
    Locks,
    Locations,
}

impl Resource {
    const fn label(self) -> &'static str {
        match self {
            Self::Threads => "threads",
            Self::Locks => "locks",
            Self::Locations => "locations",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Default)]
pub(crate) struct Settings {
    stack_depth: AtomicUsize,
    track_allocations: AtomicBool,
    limits: [AtomicUsize; 3],
    exhausted: [AtomicBool; 3],
}

impl Settings {
    pub(crate) fn new(config: &DetectorConfig) -> Self {
        let settings = Self::default();
        settings.apply(config);
        settings
    }

    pub(crate) fn apply(&self, config: &DetectorConfig) {
        self.stack_depth.store(config.stack_depth(), Ordering::Relaxed);
        self.track_allocations
            .store(config.track_allocations, Ordering::Relaxed);
        for (resource, limit) in [
            (Resource::Threads, config.max_threads),
            (Resource::Locks, config.max_locks),
            (Resource::Locations, config.max_tracked_locations),
        ] {
            self.limits[resource.index()].store(limit, Ordering::Relaxed);
            self.exhausted[resource.index()].store(false, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn stack_depth(&self) -> usize {
        self.stack_depth.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn track_allocations(&self) -> bool {
        self.track_allocations.load(Ordering::Relaxed)
    }

    /// Check if one more entity of `resource` fits next to the `len()`
    /// existing ones
    ///
    /// `len` is only evaluated when a limit is set. Logs `CapacityExhausted`
    /// the first time a limit binds per session.
    pub(crate) fn admit(&self, resource: Resource, len: impl FnOnce() -> usize) -> bool {
        let limit = self.limits[resource.index()].load(Ordering::Relaxed);
        if limit == 0 || !at_capacity(limit, len()) {
            return true;
        }
        if !self.exhausted[resource.index()].swap(true, Ordering::Relaxed) {
            let err = DetectorError::CapacityExhausted {
                resource: resource.label(),
                limit,
            };
            warn!(%err, "further {} stay untracked", resource.label());
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_respects_limit() {
        let config = DetectorConfig::builder().max_locks(2).build();
        let settings = Settings::new(&config);
        assert!(settings.admit(Resource::Locks, || 1));
        assert!(!settings.admit(Resource::Locks, || 2));
        assert!(!settings.admit(Resource::Locks, || 3));
        assert!(settings.admit(Resource::Threads, || 1_000));
    }

    #[test]
    fn test_apply_resets_exhaustion() {
        let settings = Settings::new(&DetectorConfig::builder().max_threads(1).build());
        assert!(!settings.admit(Resource::Threads, || 1));
        settings.apply(&DetectorConfig::default());
        assert!(settings.admit(Resource::Threads, || 1));
        assert_eq!(settings.stack_depth(), racetrack_core::MAX_STACK_SIZE);
        assert!(settings.track_allocations());
    }

    #[test]
    fn test_unlimited_skips_len() {
        let settings = Settings::new(&DetectorConfig::default());
        assert!(settings.admit(Resource::Locations, || unreachable!("len counted")));

        let settings = Settings::new(&DetectorConfig::builder().max_tracked_locations(4).build());
        let counted = std::cell::Cell::new(false);
        assert!(settings.admit(Resource::Locations, || {
            counted.set(true);
            3
        }));
        assert!(counted.get());
    }
}
