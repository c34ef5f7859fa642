//! Router-level tests of the public read surface: edge caching headers,
//! cache-backed reads, artifact serving, and health probes.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header::CACHE_CONTROL},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use vetrina::{
    application::sources::{ArtifactWriter, ContentApiError, ContentReader},
    cache::{CacheConfig, EdgePolicy, EventKind, QueryCache},
    domain::{ResourceDescriptor, ResourceRegistry},
    infra::{
        artifacts::FsArtifactStore,
        http::{HttpState, build_router},
    },
};

struct StubContent {
    calls: AtomicUsize,
    payload: Value,
}

impl StubContent {
    fn new(payload: Value) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            payload,
        })
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
        Ok(Bytes::from(self.payload.to_string()))
    }
}

struct TestEdge {
    router: Router,
    cache: QueryCache,
    _artifact_dir: tempfile::TempDir,
}

async fn test_edge(payload: Value) -> TestEdge {
    let artifact_dir = tempfile::tempdir().expect("tempdir");
    let artifacts =
        Arc::new(FsArtifactStore::new(artifact_dir.path().to_path_buf()).expect("artifact store"));
    let registry = Arc::new(ResourceRegistry::standard().expect("registry"));
    let cache = QueryCache::new(&CacheConfig::default(), registry, StubContent::new(payload));

    let state = HttpState {
        cache: cache.clone(),
        artifacts,
        edge: EdgePolicy {
            s_maxage_seconds: 300,
            stale_while_revalidate_seconds: 600,
        },
    };

    TestEdge {
        router: build_router(state),
        cache,
        _artifact_dir: artifact_dir,
    }
}

fn get(path: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn get_data_carries_edge_caching_directive() {
    let edge = test_edge(json!([])).await;

    let response = edge.router.oneshot(get("/data/products")).await.expect("response");

    let header = response
        .headers()
        .get(CACHE_CONTROL)
        .expect("cache-control header on GET")
        .to_str()
        .expect("header value");
    assert_eq!(header, "public, s-maxage=300, stale-while-revalidate=600");
}

#[tokio::test]
async fn mutations_carry_no_caching_directive() {
    for method in [Method::POST, Method::PUT, Method::DELETE] {
        let edge = test_edge(json!([])).await;
        let request = Request::builder()
            .method(method.clone())
            .uri("/data/products")
            .body(Body::empty())
            .expect("request");

        let response = edge.router.oneshot(request).await.expect("response");
        assert!(
            response.headers().get(CACHE_CONTROL).is_none(),
            "{method} response must not be cacheable by intermediaries"
        );
    }
}

#[tokio::test]
async fn unknown_resource_is_not_found() {
    let edge = test_edge(json!([])).await;

    let response = edge.router.oneshot(get("/data/inquiries")).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn absent_entry_reads_as_no_content_then_populates() {
    let edge = test_edge(json!([{"name": "Ada"}])).await;
    let mut events = edge.cache.subscribe();

    let response = edge
        .router
        .clone()
        .oneshot(get("/data/teammembers"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The miss scheduled a background live fetch; wait for it to land.
    loop {
        let event = events.recv().await.expect("event");
        if event.kind == EventKind::LiveFetched {
            break;
        }
    }

    let response = edge.router.oneshot(get("/data/teammembers")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.expect("body").to_bytes();
    let value: Value = serde_json::from_slice(&body).expect("json body");
    assert_eq!(value, json!([{"name": "Ada"}]));
}

#[tokio::test]
async fn snapshots_are_served_with_last_modified() {
    let edge = test_edge(json!([])).await;

    // Write an artifact through the same store the route serves from.
    let store = FsArtifactStore::new(edge._artifact_dir.path().to_path_buf()).expect("store");
    let descriptor = ResourceDescriptor::new("products", "products.json", "/api/products");
    ArtifactWriter::write(&store, &descriptor, br#"[{"sku":"p-1"}]"#)
        .await
        .expect("write artifact");

    let response = edge
        .router
        .clone()
        .oneshot(get("/snapshots/products.json"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("last-modified").is_some());
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok()),
        Some("application/json")
    );

    let missing = edge
        .router
        .oneshot(get("/snapshots/absent.json"))
        .await
        .expect("response");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_endpoints_respond() {
    let edge = test_edge(json!([])).await;

    let response = edge.router.clone().oneshot(get("/_health")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = edge.router.oneshot(get("/_health/cache")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.expect("body").to_bytes();
    let stats: Value = serde_json::from_slice(&body).expect("stats json");
    assert!(stats.get("entries").is_some());
}
