//! Cache freshness configuration.
//!
//! Two windows govern the pipeline: the in-memory `(stale, retention)` pair
//! and the wire-level `(s-maxage, stale-while-revalidate)` pair emitted by
//! the edge policy. They are configured consistently but remain independent
//! knobs.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_STALE_SECONDS: u64 = 300;
const DEFAULT_RETENTION_SECONDS: u64 = 3600;
const DEFAULT_ENTRY_LIMIT: usize = 256;
const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;

/// In-memory query cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds before a cached value is considered stale and a read schedules
    /// background revalidation.
    pub stale_seconds: u64,
    /// Seconds of disuse after which an entry becomes an eviction candidate.
    pub retention_seconds: u64,
    /// Maximum number of cache entries (parameterized reads add cardinality).
    pub entry_limit: usize,
    /// Interval of the opportunistic eviction sweep.
    pub sweep_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_seconds: DEFAULT_STALE_SECONDS,
            retention_seconds: DEFAULT_RETENTION_SECONDS,
            entry_limit: DEFAULT_ENTRY_LIMIT,
            sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECONDS,
        }
    }
}

impl CacheConfig {
    pub fn stale(&self) -> Duration {
        Duration::from_secs(self.stale_seconds)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    /// Entry limit as `NonZeroUsize`, clamping to 1 if zero.
    pub fn entry_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.entry_limit).unwrap_or(NonZeroUsize::MIN)
    }

    /// The invariant the config loader enforces before a cache is built.
    pub fn windows_are_ordered(&self) -> bool {
        self.stale_seconds <= self.retention_seconds
    }
}
