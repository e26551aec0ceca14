//! # Detector Configuration
//!
//! Settings are fixed at `init` time. They come either from a serialized
//! `DetectorConfig`, from the builder, or from the argument vector passed to
//! `Detector::init`:
//!
//! ```text
//! --stack-size N        frames captured per access (1..=16)
//! --no-alloc-tracking   ignore allocate/deallocate events
//! --max-threads N       tracked thread limit (0 = unlimited)
//! --max-locks N         tracked lock limit
//! --max-locations N     tracked memory location limit
//! --max-freed N         freed allocations kept for reuse checks (default 65536)
//! ```
//!
//! Both `--flag N` and `--flag=N` are accepted. Unknown arguments are ignored.

use crate::abi::MAX_STACK_SIZE;
use crate::error::{DetectorError, DetectorResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Freed allocations retained by default
pub const DEFAULT_MAX_FREED_ALLOCATIONS: usize = 1 << 16;

/// Detector settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Frames captured per access in race reports
    pub max_stack_size: usize,
    /// Track allocate/deallocate events for use-after-free attribution
    pub track_allocations: bool,
    /// Maximum tracked threads (0 = unlimited)
    pub max_threads: usize,
    /// Maximum tracked locks and signal identifiers (0 = unlimited)
    pub max_locks: usize,
    /// Maximum tracked memory locations (0 = unlimited)
    pub max_tracked_locations: usize,
    /// Freed allocations retained for reuse checks (0 = unlimited)
    ///
    /// Blocks whose free every live thread has observed are dropped early.
    pub max_freed_allocations: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_stack_size: MAX_STACK_SIZE,
            track_allocations: true,
            max_threads: 0,
            max_locks: 0,
            max_tracked_locations: 0,
            max_freed_allocations: DEFAULT_MAX_FREED_ALLOCATIONS,
        }
    }
}

impl DetectorConfig {
    /// Start a builder from the defaults
    pub fn builder() -> DetectorConfigBuilder {
        DetectorConfigBuilder::new()
    }

    /// Parse `init` arguments on top of the defaults
    ///
    /// # Errors
    ///
    /// See [`DetectorConfig::apply_args`].
    pub fn from_args(args: &[&str]) -> DetectorResult<Self> {
        let mut config = Self::default();
        config.apply_args(args)?;
        Ok(config)
    }

    /// Parse `init` arguments on top of this config
    ///
    /// # Errors
    ///
    /// `DetectorError::InvalidArgument` for a known flag with a missing or
    /// malformed value. The config is left unchanged in that case.
    pub fn apply_args(&mut self, args: &[&str]) -> DetectorResult<()> {
        let mut next = self.clone();
        let mut iter = args.iter().copied();

        while let Some(arg) = iter.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag, Some(value)),
                None => (arg, None),
            };

            match flag {
                "--no-alloc-tracking" => next.track_allocations = false,
                "--stack-size" | "--max-threads" | "--max-locks" | "--max-locations"
                | "--max-freed" => {
                    let raw = inline
                        .or_else(|| iter.next())
                        .ok_or_else(|| DetectorError::invalid_argument(flag, "missing value"))?;
                    let value = raw.parse::<usize>().map_err(|e| {
                        DetectorError::invalid_argument(flag, format!("{raw:?}: {e}"))
                    })?;
                    match flag {
                        "--stack-size" => {
                            if value == 0 || value > MAX_STACK_SIZE {
                                return Err(DetectorError::invalid_argument(
                                    flag,
                                    format!("must be within 1..={MAX_STACK_SIZE}"),
                                ));
                            }
                            next.max_stack_size = value;
                        }
                        "--max-threads" => next.max_threads = value,
                        "--max-locks" => next.max_locks = value,
                        "--max-locations" => next.max_tracked_locations = value,
                        _ => next.max_freed_allocations = value,
                    }
                }
                _ => debug!(arg, "ignoring unknown detector argument"),
            }
        }

        *self = next;
        Ok(())
    }

    /// Effective stack depth, clamped to the report capacity
    pub fn stack_depth(&self) -> usize {
        self.max_stack_size.clamp(1, MAX_STACK_SIZE)
    }
}

/// Check a configured limit against the current population
///
/// A limit of 0 never binds.
#[inline]
pub const fn at_capacity(limit: usize, len: usize) -> bool {
    limit != 0 && len >= limit
}

/// Config builder for ergonomic construction
#[derive(Debug, Clone, Default)]
pub struct DetectorConfigBuilder {
    config: DetectorConfig,
}

impl DetectorConfigBuilder {
    /// Create new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set captured stack depth
    pub fn stack_size(mut self, frames: usize) -> Self {
        self.config.max_stack_size = frames;
        self
    }

    /// Enable or disable allocation tracking
    pub fn track_allocations(mut self, enabled: bool) -> Self {
        self.config.track_allocations = enabled;
        self
    }

    /// Set thread limit
    pub fn max_threads(mut self, limit: usize) -> Self {
        self.config.max_threads = limit;
        self
    }

    /// Set lock limit
    pub fn max_locks(mut self, limit: usize) -> Self {
        self.config.max_locks = limit;
        self
    }

    /// Set tracked location limit
    pub fn max_tracked_locations(mut self, limit: usize) -> Self {
        self.config.max_tracked_locations = limit;
        self
    }

    /// Set retained freed allocation limit
    pub fn max_freed_allocations(mut self, limit: usize) -> Self {
        self.config.max_freed_allocations = limit;
        self
    }

    /// Build the config
    pub fn build(self) -> DetectorConfig {
        self.config
    }
}
