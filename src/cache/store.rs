//! Query cache storage.
//!
//! Holds the in-memory entries behind poison-recovering locks. Every write is
//! a single wholesale replace of the entry, so a reader can never observe a
//! value without its fetch timestamp or vice versa. Freshness math lives
//! here; scheduling of refreshes lives in the service layer.

use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;

use lru::LruCache;
use serde_json::Value;
use tokio::time::Instant;

use super::config::CacheConfig;
use super::keys::QueryKey;
use super::lock::{read_guard, write_guard};

/// One cached query result.
///
/// `initial_age` carries the observable age of a seeded snapshot so that an
/// artifact older than the stale window enters the cache already stale
/// instead of being trusted as fresh.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Arc<Value>,
    pub fetched_at: Instant,
    pub last_read: Instant,
    pub initial_age: Duration,
}

impl CacheEntry {
    fn new(value: Arc<Value>, initial_age: Duration, now: Instant) -> Self {
        Self {
            value,
            fetched_at: now,
            last_read: now,
            initial_age,
        }
    }

    /// Effective age of the cached value.
    pub fn age(&self, now: Instant) -> Duration {
        now.duration_since(self.fetched_at) + self.initial_age
    }

    /// Time since the entry was last returned to a reader.
    pub fn idle(&self, now: Instant) -> Duration {
        now.duration_since(self.last_read)
    }
}

/// Observable state of a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Absent,
    /// Absent, with a live fetch in flight.
    Loading,
    Fresh,
    /// Past the stale window, no refresh running yet.
    Stale,
    /// Past the stale window, refresh in flight; readers keep seeing the old
    /// value until the refresh lands.
    Revalidating,
}

/// Outcome of a read against the store.
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    /// No entry for the key.
    Missing,
    /// The entry outlived its retention window and was dropped on access.
    Expired,
    /// The current value, plus whether it is past the stale window.
    Hit { value: Arc<Value>, stale: bool },
}

/// Aggregate counts for health reporting.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct StoreStats {
    pub entries: usize,
    pub fresh: usize,
    pub stale: usize,
}

pub struct QueryStore {
    stale_after: Duration,
    retention: Duration,
    entries: RwLock<LruCache<QueryKey, CacheEntry>>,
}

impl QueryStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            stale_after: config.stale(),
            retention: config.retention(),
            entries: RwLock::new(LruCache::new(config.entry_limit_non_zero())),
        }
    }

    /// Read the current value for a key, bumping its recency.
    ///
    /// An entry past its retention window is removed on access and reported
    /// as `Expired`; the caller treats that exactly like a miss.
    pub fn read(&self, key: &QueryKey) -> ReadOutcome {
        let now = Instant::now();
        let mut entries = write_guard(&self.entries, "read");

        let Some(entry) = entries.get_mut(key) else {
            return ReadOutcome::Missing;
        };

        if entry.idle(now) > self.retention {
            entries.pop(key);
            return ReadOutcome::Expired;
        }

        let stale = entry.age(now) > self.stale_after;
        entry.last_read = now;
        ReadOutcome::Hit {
            value: Arc::clone(&entry.value),
            stale,
        }
    }

    /// Replace the entry for a key with a just-fetched value.
    pub fn put(&self, key: QueryKey, value: Arc<Value>) {
        let now = Instant::now();
        write_guard(&self.entries, "put").put(key, CacheEntry::new(value, Duration::ZERO, now));
    }

    /// Insert a snapshot-seeded value, back-dated by the artifact's
    /// observable age. Skipped when a live fetch already populated the key,
    /// so seeding can never regress a fresher value.
    pub fn put_seeded(&self, key: QueryKey, value: Arc<Value>, age: Duration) -> bool {
        let now = Instant::now();
        let mut entries = write_guard(&self.entries, "put_seeded");
        if entries.contains(&key) {
            return false;
        }
        entries.put(key, CacheEntry::new(value, age, now));
        true
    }

    /// State of a key without bumping recency; in-flight knowledge is layered
    /// on by the service.
    pub fn state(&self, key: &QueryKey) -> EntryState {
        let now = Instant::now();
        let entries = read_guard(&self.entries, "state");
        match entries.peek(key) {
            None => EntryState::Absent,
            Some(entry) if entry.idle(now) > self.retention => EntryState::Absent,
            Some(entry) if entry.age(now) > self.stale_after => EntryState::Stale,
            Some(_) => EntryState::Fresh,
        }
    }

    /// Drop every entry idle past the retention window, returning the evicted
    /// keys so the service can announce them.
    pub fn sweep(&self) -> Vec<QueryKey> {
        let now = Instant::now();
        let mut entries = write_guard(&self.entries, "sweep");
        let expired: Vec<QueryKey> = entries
            .iter()
            .filter(|(_, entry)| entry.idle(now) > self.retention)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired
    }

    pub fn stats(&self) -> StoreStats {
        let now = Instant::now();
        let entries = read_guard(&self.entries, "stats");
        let mut stats = StoreStats {
            entries: entries.len(),
            ..StoreStats::default()
        };
        for (_, entry) in entries.iter() {
            if entry.age(now) > self.stale_after {
                stats.stale += 1;
            } else {
                stats.fresh += 1;
            }
        }
        stats
    }

    pub fn len(&self) -> usize {
        read_guard(&self.entries, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
