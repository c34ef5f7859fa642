//! The query cache: seeded at startup, revalidated in the background.
//!
//! `QueryCache` is an explicit, constructed object with one instance per
//! running process; nothing here is global. Reads never block on the network:
//! a reader gets whatever is currently cached (stale included) and staleness
//! only schedules a coalesced background refresh. Refresh failures are
//! retained silently; the worst observable symptom is stale or absent data,
//! never an error.

use std::sync::Arc;

use dashmap::DashMap;
use metrics::{counter, histogram};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::application::sources::ContentReader;
use crate::domain::ResourceRegistry;

use super::config::CacheConfig;
use super::events::{CacheEvent, CacheEvents, EventKind};
use super::keys::QueryKey;
use super::store::{EntryState, QueryStore, ReadOutcome, StoreStats};

const METRIC_CACHE_HIT: &str = "vetrina_cache_hit_total";
const METRIC_CACHE_MISS: &str = "vetrina_cache_miss_total";
const METRIC_CACHE_EVICT: &str = "vetrina_cache_evict_total";
const METRIC_CACHE_REVALIDATE: &str = "vetrina_cache_revalidate_total";
const METRIC_CACHE_SWEEP_MS: &str = "vetrina_cache_sweep_ms";

/// Per-key in-flight refresh markers.
///
/// Two concurrent stale reads of the same key must share one revalidation
/// rather than fanning out duplicate network calls; the first caller claims
/// the marker, everyone else piggybacks on its outcome.
struct InFlightRefreshes {
    keys: DashMap<QueryKey, ()>,
}

impl InFlightRefreshes {
    fn new() -> Self {
        Self {
            keys: DashMap::new(),
        }
    }

    /// Claim the key. Returns false when a refresh is already running.
    fn begin(&self, key: &QueryKey) -> bool {
        use dashmap::mapref::entry::Entry;
        match self.keys.entry(key.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(());
                true
            }
        }
    }

    fn finish(&self, key: &QueryKey) {
        self.keys.remove(key);
    }

    fn contains(&self, key: &QueryKey) -> bool {
        self.keys.contains_key(key)
    }
}

struct CacheInner {
    registry: Arc<ResourceRegistry>,
    content: Arc<dyn ContentReader>,
    store: QueryStore,
    inflight: InFlightRefreshes,
    events: CacheEvents,
}

/// Cheaply cloneable handle to the process-wide query cache instance.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    pub fn new(
        config: &CacheConfig,
        registry: Arc<ResourceRegistry>,
        content: Arc<dyn ContentReader>,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                registry,
                content,
                store: QueryStore::new(config),
                inflight: InFlightRefreshes::new(),
                events: CacheEvents::new(),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.inner.registry
    }

    /// Read the current value for a key.
    ///
    /// Present entries are returned immediately regardless of freshness; a
    /// stale entry additionally schedules one background revalidation. An
    /// absent (or retention-expired) entry schedules a background live fetch
    /// and yields `None`; callers tolerate a later asynchronous population.
    pub fn read(&self, key: &QueryKey) -> Option<Arc<Value>> {
        match self.inner.store.read(key) {
            ReadOutcome::Hit { value, stale } => {
                counter!(METRIC_CACHE_HIT).increment(1);
                if stale {
                    self.spawn_refresh(key.clone());
                }
                Some(value)
            }
            ReadOutcome::Expired => {
                counter!(METRIC_CACHE_EVICT).increment(1);
                self.inner.events.publish(key.clone(), EventKind::Evicted);
                counter!(METRIC_CACHE_MISS).increment(1);
                self.spawn_refresh(key.clone());
                None
            }
            ReadOutcome::Missing => {
                counter!(METRIC_CACHE_MISS).increment(1);
                self.spawn_refresh(key.clone());
                None
            }
        }
    }

    /// Populate a key from a parsed snapshot artifact.
    ///
    /// `age` back-dates the entry by the artifact's observable age so a
    /// snapshot older than the stale window is revalidated on first read
    /// instead of being trusted as fresh. Never overwrites a value a live
    /// fetch has already stored.
    pub fn insert_seeded(&self, key: QueryKey, value: Value, age: std::time::Duration) -> bool {
        let inserted = self
            .inner
            .store
            .put_seeded(key.clone(), Arc::new(value), age);
        if inserted {
            self.inner.events.publish(key, EventKind::Seeded);
        }
        inserted
    }

    /// Run one refresh for the key on the caller's task, coalesced with any
    /// refresh already in flight. Returns true when this call populated the
    /// entry.
    pub async fn refresh_now(&self, key: QueryKey) -> bool {
        if !self.inner.inflight.begin(&key) {
            debug!(target = "vetrina::cache", key = %key, "refresh already in flight");
            return false;
        }
        let populated = self.fetch_and_store(&key).await;
        self.inner.inflight.finish(&key);
        populated
    }

    fn spawn_refresh(&self, key: QueryKey) {
        if !self.inner.inflight.begin(&key) {
            return;
        }
        let cache = self.clone();
        tokio::spawn(async move {
            cache.fetch_and_store(&key).await;
            cache.inner.inflight.finish(&key);
        });
    }

    /// Live-fetch the key and atomically replace its entry.
    ///
    /// Failures retain the previous value (if any) and are logged, never
    /// surfaced to readers.
    async fn fetch_and_store(&self, key: &QueryKey) -> bool {
        let Some(descriptor) = self.inner.registry.get(key.resource.as_str()) else {
            warn!(
                target = "vetrina::cache",
                key = %key,
                "refresh requested for unregistered resource"
            );
            return false;
        };
        let descriptor = *descriptor;

        let bytes = match self.inner.content.fetch(&descriptor, key.params()).await {
            Ok(bytes) => bytes,
            Err(error) => {
                counter!(METRIC_CACHE_REVALIDATE, "outcome" => "failed").increment(1);
                warn!(
                    target = "vetrina::cache",
                    key = %key,
                    error = %error,
                    "live fetch failed, retaining previous value"
                );
                return false;
            }
        };

        let value: Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(error) => {
                counter!(METRIC_CACHE_REVALIDATE, "outcome" => "failed").increment(1);
                warn!(
                    target = "vetrina::cache",
                    key = %key,
                    error = %error,
                    "live payload was not valid json, retaining previous value"
                );
                return false;
            }
        };

        let kind = match self.inner.store.state(key) {
            EntryState::Absent => EventKind::LiveFetched,
            _ => EventKind::Refreshed,
        };
        self.inner.store.put(key.clone(), Arc::new(value));
        counter!(METRIC_CACHE_REVALIDATE, "outcome" => "ok").increment(1);
        self.inner.events.publish(key.clone(), kind);
        true
    }

    /// Observable state of a key, including in-flight refresh knowledge.
    pub fn state(&self, key: &QueryKey) -> EntryState {
        match self.inner.store.state(key) {
            EntryState::Absent if self.inner.inflight.contains(key) => EntryState::Loading,
            EntryState::Stale if self.inner.inflight.contains(key) => EntryState::Revalidating,
            state => state,
        }
    }

    /// Opportunistic retention sweep; evictions are invisible to readers.
    pub fn sweep(&self) {
        let started_at = std::time::Instant::now();
        let evicted = self.inner.store.sweep();
        for key in evicted {
            counter!(METRIC_CACHE_EVICT).increment(1);
            debug!(target = "vetrina::cache", key = %key, "evicted after retention window");
            self.inner.events.publish(key, EventKind::Evicted);
        }
        histogram!(METRIC_CACHE_SWEEP_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    pub fn stats(&self) -> StoreStats {
        self.inner.store.stats()
    }
}
