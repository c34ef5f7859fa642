//! Cache event notifications.
//!
//! Every population, refresh, and eviction of the query cache is announced on
//! a broadcast channel so stale consumers can re-read without polling. Events
//! carry a monotonic epoch for ordering within the process.

use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::keys::QueryKey;

const CHANNEL_CAPACITY: usize = 64;

/// Monotonic epoch for ordering events within one process.
pub type Epoch = u64;

/// A single cache state change.
#[derive(Debug, Clone)]
pub struct CacheEvent {
    /// Unique identifier for idempotent consumers (UUIDv4).
    pub id: Uuid,
    /// Monotonic epoch within this process.
    pub epoch: Epoch,
    pub key: QueryKey,
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
}

/// What happened to the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Populated from a snapshot artifact at startup.
    Seeded,
    /// Populated from a live fetch (artifact fallback or cache miss).
    LiveFetched,
    /// Replaced by a successful background revalidation.
    Refreshed,
    /// Removed after the retention window of disuse.
    Evicted,
}

/// Broadcast fan-out of cache events.
///
/// Publishing never blocks and never fails: with no subscribers the event is
/// simply dropped, and slow subscribers observe a lag error on their
/// receiver, not backpressure on the cache.
pub struct CacheEvents {
    sender: broadcast::Sender<CacheEvent>,
    epoch_counter: AtomicU64,
}

impl CacheEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    pub fn publish(&self, key: QueryKey, kind: EventKind) {
        let event = CacheEvent {
            id: Uuid::new_v4(),
            epoch: self.next_epoch(),
            key,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        };
        // Err means no live subscriber, which is the common serve-only case.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.sender.subscribe()
    }
}

impl Default for CacheEvents {
    fn default() -> Self {
        Self::new()
    }
}
