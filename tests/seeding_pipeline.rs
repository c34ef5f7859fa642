//! End-to-end pipeline tests: snapshot export into a real artifact
//! directory, then seeding a fresh query cache from those artifacts,
//! locally and over HTTP.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Value, json};
use vetrina::{
    application::sources::{ContentApiError, ContentReader},
    cache::{CacheConfig, CacheSeeder, EdgePolicy, EntryState, QueryCache, QueryKey},
    domain::{ResourceDescriptor, ResourceId, ResourceRegistry},
    infra::{
        artifacts::{FsArtifactStore, HttpArtifactFetcher},
        http::{HttpState, build_router},
    },
    snapshot::SnapshotGenerator,
};

/// Content API double serving fixed payloads per resource.
struct FixtureContent {
    calls: AtomicUsize,
    payloads: HashMap<&'static str, Value>,
}

impl FixtureContent {
    fn new(payloads: HashMap<&'static str, Value>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            payloads,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentReader for FixtureContent {
    async fn fetch(
        &self,
        descriptor: &ResourceDescriptor,
        _params: Option<&str>,
    ) -> Result<Bytes, ContentApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.payloads.get(descriptor.id.as_str()) {
            Some(value) => Ok(Bytes::from(value.to_string())),
            None => Err(ContentApiError::Status { status: 503 }),
        }
    }
}

fn registry() -> Arc<ResourceRegistry> {
    Arc::new(
        ResourceRegistry::new(vec![
            ResourceDescriptor::new("products", "products.json", "/api/products"),
            ResourceDescriptor::new("teammembers", "teammembers.json", "/api/teammembers"),
        ])
        .expect("registry"),
    )
}

fn nine_products() -> Value {
    json!([
        {"sku": "p-1"}, {"sku": "p-2"}, {"sku": "p-3"},
        {"sku": "p-4"}, {"sku": "p-5"}, {"sku": "p-6"},
        {"sku": "p-7"}, {"sku": "p-8"}, {"sku": "p-9"}
    ])
}

fn key(id: &'static str) -> QueryKey {
    QueryKey::bare(ResourceId::new(id))
}

#[tokio::test]
async fn exported_artifacts_seed_a_fresh_cache_without_live_calls() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FsArtifactStore::new(dir.path().to_path_buf()).expect("store"));

    // Deploy-time half: export both resources.
    let export_content = FixtureContent::new(HashMap::from([
        ("products", nine_products()),
        ("teammembers", json!([{"name": "Ada"}])),
    ]));
    let generator = SnapshotGenerator::new(registry(), export_content, store.clone());
    let report = generator.run().await;
    assert_eq!(report.written_count(), 2);

    // Runtime half: a fresh process seeds from the artifacts alone.
    let serve_content = FixtureContent::new(HashMap::new());
    let cache = QueryCache::new(&CacheConfig::default(), registry(), serve_content.clone());
    let seeder = CacheSeeder::new(cache.clone(), store);
    let summary = seeder.seed().await;
    assert_eq!(summary.seeded, 2);

    let value = cache.read(&key("products")).expect("seeded products");
    assert_eq!(*value, nine_products());
    assert_eq!(value.as_array().map(Vec::len), Some(9));
    assert_eq!(cache.state(&key("products")), EntryState::Fresh);
    assert_eq!(
        serve_content.calls(),
        0,
        "artifact-seeded reads must not touch the network"
    );
}

#[tokio::test]
async fn failed_export_leaves_the_previous_artifact_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FsArtifactStore::new(dir.path().to_path_buf()).expect("store"));

    let first = FixtureContent::new(HashMap::from([
        ("products", json!(["v1"])),
        ("teammembers", json!(["team-v1"])),
    ]));
    let report = SnapshotGenerator::new(registry(), first, store.clone())
        .run()
        .await;
    assert_eq!(report.written_count(), 2);

    // Second run: teammembers now fails upstream.
    let second = FixtureContent::new(HashMap::from([("products", json!(["v2"]))]));
    let report = SnapshotGenerator::new(registry(), second, store.clone())
        .run()
        .await;
    assert_eq!(report.written_count(), 1);
    assert_eq!(report.failed_count(), 1);

    let (bytes, _) = store.open("products.json").await.expect("products artifact");
    assert_eq!(&bytes[..], json!(["v2"]).to_string().as_bytes());

    let (bytes, _) = store
        .open("teammembers.json")
        .await
        .expect("teammembers artifact");
    assert_eq!(
        &bytes[..],
        json!(["team-v1"]).to_string().as_bytes(),
        "failed export must leave the prior artifact in place"
    );
}

#[tokio::test]
async fn seeder_fetches_artifacts_over_http() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FsArtifactStore::new(dir.path().to_path_buf()).expect("store"));

    let export_content = FixtureContent::new(HashMap::from([
        ("products", nine_products()),
        ("teammembers", json!([{"name": "Ada"}])),
    ]));
    SnapshotGenerator::new(registry(), export_content, store.clone())
        .run()
        .await;

    // Serve the artifact directory the way a deployment would.
    let host_content = FixtureContent::new(HashMap::new());
    let host_cache = QueryCache::new(&CacheConfig::default(), registry(), host_content);
    let router = build_router(HttpState {
        cache: host_cache,
        artifacts: store,
        edge: EdgePolicy::default(),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    let server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .await
            .expect("serve");
    });

    let base = url::Url::parse(&format!("http://{addr}/snapshots/")).expect("base url");
    let fetcher = Arc::new(
        HttpArtifactFetcher::new(base, std::time::Duration::from_secs(5)).expect("fetcher"),
    );

    let serve_content = FixtureContent::new(HashMap::new());
    let cache = QueryCache::new(&CacheConfig::default(), registry(), serve_content.clone());
    let summary = CacheSeeder::new(cache.clone(), fetcher).seed().await;

    assert_eq!(summary.seeded, 2);
    let value = cache.read(&key("teammembers")).expect("seeded over http");
    assert_eq!(*value, json!([{"name": "Ada"}]));
    assert_eq!(serve_content.calls(), 0);

    server.abort();
}

#[tokio::test]
async fn absent_artifact_and_dead_backend_leave_entry_absent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FsArtifactStore::new(dir.path().to_path_buf()).expect("store"));

    // Nothing exported, and the backend knows no resources either.
    let serve_content = FixtureContent::new(HashMap::new());
    let cache = QueryCache::new(&CacheConfig::default(), registry(), serve_content.clone());
    let summary = CacheSeeder::new(cache.clone(), store).seed().await;

    assert_eq!(summary.absent, 2);
    assert!(cache.read(&key("products")).is_none());
    // One live attempt per resource during seeding; read-time retries are
    // scheduled in the background on each miss.
    assert!(serve_content.calls() >= 2);
}
