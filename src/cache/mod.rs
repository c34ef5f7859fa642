//! Vetrina query cache.
//!
//! The runtime half of the read-freshness pipeline:
//!
//! - **Seeder**: populates the cache from snapshot artifacts at startup,
//!   falling back to live fetches when an artifact is unavailable.
//! - **Revalidator**: serves cached values immediately (stale included) and
//!   refreshes stale entries in the background, one in-flight refresh per
//!   key.
//! - **Edge policy**: the `Cache-Control` directive attached to public GET
//!   responses, independent of the in-memory cache.
//!
//! ## Configuration
//!
//! Freshness windows come from `vetrina.toml`:
//!
//! ```toml
//! [cache]
//! stale_seconds = 300
//! retention_seconds = 3600
//!
//! [edge]
//! s_maxage_seconds = 300
//! stale_while_revalidate_seconds = 600
//! ```

mod config;
mod events;
mod keys;
mod lock;
mod middleware;
mod seeder;
mod service;
mod store;

pub use config::CacheConfig;
pub use events::{CacheEvent, CacheEvents, Epoch, EventKind};
pub use keys::{QueryKey, canonicalize_params, hash_value};
pub use middleware::{EdgePolicy, edge_cache_layer};
pub use seeder::{CacheSeeder, SeedSummary};
pub use service::QueryCache;
pub use store::{EntryState, StoreStats};
