//! Startup cache seeding from snapshot artifacts.
//!
//! Runs at most once per cache instance: every registered resource's
//! artifact is loaded concurrently, parsed, and written into the query
//! cache. An unavailable or corrupt artifact falls back to a single live
//! fetch against the Content API; when that fails too the entry stays
//! absent and normal read-time fetching retries later. Seeding is spawned
//! by the server and never blocks startup; consumers read whatever is
//! cached and tolerate a later asynchronous population.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use metrics::counter;
use tracing::{debug, info, warn};

use crate::application::sources::{ArtifactError, ArtifactFetcher};
use crate::domain::ResourceDescriptor;

use super::keys::QueryKey;
use super::service::QueryCache;

const METRIC_SEED_ARTIFACT: &str = "vetrina_seed_artifact_total";
const METRIC_SEED_FALLBACK: &str = "vetrina_seed_fallback_total";

/// How the seeding round went, per resource class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Entries populated from their artifact.
    pub seeded: usize,
    /// Entries populated by the live fallback.
    pub fell_back: usize,
    /// Entries left absent for read-time fetching.
    pub absent: usize,
}

#[derive(Debug, Clone, Copy)]
enum SeedOutcome {
    Seeded,
    FellBack,
    Absent,
}

pub struct CacheSeeder {
    cache: QueryCache,
    artifacts: Arc<dyn ArtifactFetcher>,
    started: AtomicBool,
}

impl CacheSeeder {
    pub fn new(cache: QueryCache, artifacts: Arc<dyn ArtifactFetcher>) -> Self {
        Self {
            cache,
            artifacts,
            started: AtomicBool::new(false),
        }
    }

    /// Seed every registered resource concurrently. Subsequent calls on the
    /// same instance are no-ops.
    pub async fn seed(&self) -> SeedSummary {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!(target = "vetrina::seeder", "seeding already ran for this instance");
            return SeedSummary::default();
        }

        let registry = Arc::clone(self.cache.registry());
        let outcomes = join_all(
            registry
                .iter()
                .map(|descriptor| self.seed_one(*descriptor)),
        )
        .await;

        let mut summary = SeedSummary::default();
        for outcome in outcomes {
            match outcome {
                SeedOutcome::Seeded => summary.seeded += 1,
                SeedOutcome::FellBack => summary.fell_back += 1,
                SeedOutcome::Absent => summary.absent += 1,
            }
        }

        info!(
            target = "vetrina::seeder",
            seeded = summary.seeded,
            fell_back = summary.fell_back,
            absent = summary.absent,
            "cache seeding complete"
        );
        summary
    }

    async fn seed_one(&self, descriptor: ResourceDescriptor) -> SeedOutcome {
        let key = QueryKey::bare(descriptor.id);

        let payload = match self.artifacts.fetch(&descriptor).await {
            Ok(payload) => payload,
            Err(ArtifactError::NotFound) => {
                counter!(METRIC_SEED_ARTIFACT, "outcome" => "missing").increment(1);
                debug!(
                    target = "vetrina::seeder",
                    resource = %descriptor.id,
                    "no artifact, falling back to live fetch"
                );
                return self.fallback(key).await;
            }
            Err(error) => {
                counter!(METRIC_SEED_ARTIFACT, "outcome" => "error").increment(1);
                warn!(
                    target = "vetrina::seeder",
                    resource = %descriptor.id,
                    error = %error,
                    "artifact load failed, falling back to live fetch"
                );
                return self.fallback(key).await;
            }
        };

        let value = match serde_json::from_slice(&payload.bytes) {
            Ok(value) => value,
            Err(error) => {
                counter!(METRIC_SEED_ARTIFACT, "outcome" => "corrupt").increment(1);
                warn!(
                    target = "vetrina::seeder",
                    resource = %descriptor.id,
                    error = %error,
                    "artifact was not valid json, falling back to live fetch"
                );
                return self.fallback(key).await;
            }
        };

        let age = payload.age.unwrap_or_default();
        counter!(METRIC_SEED_ARTIFACT, "outcome" => "ok").increment(1);
        debug!(
            target = "vetrina::seeder",
            resource = %descriptor.id,
            age_seconds = age.as_secs(),
            "seeded from artifact"
        );
        self.cache.insert_seeded(key, value, age);
        SeedOutcome::Seeded
    }

    async fn fallback(&self, key: QueryKey) -> SeedOutcome {
        if self.cache.refresh_now(key.clone()).await {
            counter!(METRIC_SEED_FALLBACK, "outcome" => "ok").increment(1);
            SeedOutcome::FellBack
        } else {
            counter!(METRIC_SEED_FALLBACK, "outcome" => "failed").increment(1);
            debug!(
                target = "vetrina::seeder",
                key = %key,
                "live fallback did not populate, leaving entry absent"
            );
            SeedOutcome::Absent
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::json;

    use crate::application::sources::{ArtifactPayload, ContentApiError, ContentReader};
    use crate::cache::config::CacheConfig;
    use crate::cache::store::EntryState;
    use crate::domain::{ResourceId, ResourceRegistry};

    use super::*;

    /// Artifact storage double keyed by resource id.
    struct StubArtifacts {
        payloads: HashMap<&'static str, ArtifactPayload>,
    }

    impl StubArtifacts {
        fn new() -> Self {
            Self {
                payloads: HashMap::new(),
            }
        }

        fn with(mut self, id: &'static str, value: serde_json::Value, age: Option<Duration>) -> Self {
            self.payloads.insert(
                id,
                ArtifactPayload {
                    bytes: Bytes::from(value.to_string()),
                    age,
                },
            );
            self
        }

        fn with_raw(mut self, id: &'static str, raw: &'static str) -> Self {
            self.payloads.insert(
                id,
                ArtifactPayload {
                    bytes: Bytes::from_static(raw.as_bytes()),
                    age: None,
                },
            );
            self
        }
    }

    #[async_trait]
    impl ArtifactFetcher for StubArtifacts {
        async fn fetch(
            &self,
            descriptor: &ResourceDescriptor,
        ) -> Result<ArtifactPayload, ArtifactError> {
            self.payloads
                .get(descriptor.id.as_str())
                .cloned()
                .ok_or(ArtifactError::NotFound)
        }
    }

    /// Content API double that serves one payload for every resource.
    struct StubContent {
        calls: AtomicUsize,
        payload: serde_json::Value,
        fail: bool,
    }

    impl StubContent {
        fn ok(payload: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                payload,
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                payload: serde_json::Value::Null,
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContentReader for StubContent {
        async fn fetch(
            &self,
            _descriptor: &ResourceDescriptor,
            _params: Option<&str>,
        ) -> Result<Bytes, ContentApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ContentApiError::Transport("stub failure".to_string()));
            }
            Ok(Bytes::from(self.payload.to_string()))
        }
    }

    fn small_registry() -> Arc<ResourceRegistry> {
        Arc::new(
            ResourceRegistry::new(vec![
                ResourceDescriptor::new("products", "products.json", "/api/products"),
                ResourceDescriptor::new("teammembers", "teammembers.json", "/api/teammembers"),
            ])
            .expect("registry"),
        )
    }

    fn key(id: &'static str) -> QueryKey {
        QueryKey::bare(ResourceId::new(id))
    }

    #[tokio::test]
    async fn valid_artifacts_seed_fresh_entries_without_live_calls() {
        let nine_products = json!([
            {"sku": "p-1"}, {"sku": "p-2"}, {"sku": "p-3"},
            {"sku": "p-4"}, {"sku": "p-5"}, {"sku": "p-6"},
            {"sku": "p-7"}, {"sku": "p-8"}, {"sku": "p-9"}
        ]);
        let artifacts = Arc::new(
            StubArtifacts::new()
                .with("products", nine_products.clone(), None)
                .with("teammembers", json!([{"name": "Ada"}]), None),
        );
        let content = StubContent::ok(json!([]));
        let cache = QueryCache::new(&CacheConfig::default(), small_registry(), content.clone());
        let seeder = CacheSeeder::new(cache.clone(), artifacts);

        let summary = seeder.seed().await;
        assert_eq!(
            summary,
            SeedSummary {
                seeded: 2,
                fell_back: 0,
                absent: 0
            }
        );

        let value = cache.read(&key("products")).expect("seeded value");
        assert_eq!(*value, nine_products);
        assert_eq!(cache.state(&key("products")), EntryState::Fresh);
        assert_eq!(content.calls(), 0, "seeded reads must not hit the network");
    }

    #[tokio::test]
    async fn missing_artifact_falls_back_to_exactly_one_live_call() {
        let artifacts = Arc::new(StubArtifacts::new().with("products", json!([]), None));
        let content = StubContent::ok(json!([{"name": "Ada"}]));
        let cache = QueryCache::new(&CacheConfig::default(), small_registry(), content.clone());
        let seeder = CacheSeeder::new(cache.clone(), artifacts);

        let summary = seeder.seed().await;
        assert_eq!(summary.seeded, 1);
        assert_eq!(summary.fell_back, 1);
        assert_eq!(content.calls(), 1);

        let value = cache.read(&key("teammembers")).expect("live fallback value");
        assert_eq!(*value, json!([{"name": "Ada"}]));
    }

    #[tokio::test]
    async fn corrupt_artifact_falls_back_to_live_fetch() {
        let artifacts = Arc::new(
            StubArtifacts::new()
                .with_raw("products", "{not json")
                .with("teammembers", json!([]), None),
        );
        let content = StubContent::ok(json!(["live"]));
        let cache = QueryCache::new(&CacheConfig::default(), small_registry(), content.clone());
        let seeder = CacheSeeder::new(cache.clone(), artifacts);

        let summary = seeder.seed().await;
        assert_eq!(summary.fell_back, 1);

        let value = cache.read(&key("products")).expect("fallback value");
        assert_eq!(*value, json!(["live"]));
    }

    #[tokio::test]
    async fn double_failure_leaves_entry_absent() {
        let artifacts = Arc::new(StubArtifacts::new());
        let content = StubContent::failing();
        let cache = QueryCache::new(&CacheConfig::default(), small_registry(), content.clone());
        let seeder = CacheSeeder::new(cache.clone(), artifacts);

        let summary = seeder.seed().await;
        assert_eq!(summary.absent, 2);
        assert_eq!(cache.state(&key("products")), EntryState::Absent);
        assert!(cache.read(&key("products")).is_none());
    }

    #[tokio::test]
    async fn aged_artifact_enters_the_cache_already_stale() {
        let artifacts = Arc::new(StubArtifacts::new().with(
            "products",
            json!([]),
            Some(Duration::from_secs(4000)),
        ));
        let content = StubContent::ok(json!([]));
        let config = CacheConfig {
            stale_seconds: 300,
            ..Default::default()
        };
        let cache = QueryCache::new(&config, small_registry(), content);
        let seeder = CacheSeeder::new(cache.clone(), artifacts);

        seeder.seed().await;
        assert_eq!(cache.state(&key("products")), EntryState::Stale);
    }

    #[tokio::test]
    async fn seeding_runs_at_most_once_per_instance() {
        let artifacts = Arc::new(StubArtifacts::new().with("products", json!([]), None).with(
            "teammembers",
            json!([]),
            None,
        ));
        let content = StubContent::ok(json!([]));
        let cache = QueryCache::new(&CacheConfig::default(), small_registry(), content);
        let seeder = CacheSeeder::new(cache.clone(), artifacts);

        let first = seeder.seed().await;
        assert_eq!(first.seeded, 2);

        let second = seeder.seed().await;
        assert_eq!(second, SeedSummary::default());
    }
}
