//! Public read surface.
//!
//! `/data/{resource}` serves the query cache and never blocks on the
//! network: a cached value (stale included) comes back as `200`, a known but
//! not-yet-populated resource as `204 No Content`. Failures below the cache
//! surface as staleness or temporary absence, never as an error body. The
//! edge cache layer shapes intermediary caching on these routes only.

use std::sync::Arc;
use std::time::SystemTime;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, RawQuery, State},
    http::{
        StatusCode,
        header::{CONTENT_TYPE, LAST_MODIFIED},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use time::OffsetDateTime;

use crate::{
    application::sources::ArtifactError,
    cache::{EdgePolicy, QueryCache, QueryKey, edge_cache_layer},
    infra::artifacts::{FsArtifactStore, format_http_date},
};

use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub cache: QueryCache,
    pub artifacts: Arc<FsArtifactStore>,
    pub edge: EdgePolicy,
}

pub fn build_router(state: HttpState) -> Router {
    // Public read routes carry the edge caching directive; health probes and
    // the artifact files themselves do not.
    let data_routes = Router::new()
        .route("/data/{resource}", get(read_resource))
        .layer(middleware::from_fn_with_state(state.edge, edge_cache_layer));

    let static_routes = Router::new()
        .route("/snapshots/{*path}", get(serve_snapshot))
        .route("/_health", get(health))
        .route("/_health/cache", get(cache_health));

    data_routes
        .merge(static_routes)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn read_resource(
    State(state): State<HttpState>,
    Path(resource): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let Some(descriptor) = state.cache.registry().get(&resource) else {
        return (StatusCode::NOT_FOUND, "unknown resource").into_response();
    };

    let key = match query.as_deref() {
        Some(query) if !query.is_empty() => QueryKey::with_params(descriptor.id, query),
        _ => QueryKey::bare(descriptor.id),
    };

    match state.cache.read(&key) {
        Some(value) => Json(value.as_ref()).into_response(),
        // Known resource, no data yet: the seeder or a background fetch will
        // populate it; this is not an error.
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn serve_snapshot(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    match state.artifacts.open(&path).await {
        Ok((bytes, modified)) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            let mut builder = Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, mime.as_ref());
            if let Some(last_modified) = modified.and_then(http_date_header) {
                builder = builder.header(LAST_MODIFIED, last_modified);
            }
            builder
                .body(Body::from(bytes))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        Err(ArtifactError::NotFound | ArtifactError::InvalidPath { .. }) => {
            (StatusCode::NOT_FOUND, "unknown snapshot").into_response()
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

fn http_date_header(modified: SystemTime) -> Option<String> {
    format_http_date(OffsetDateTime::from(modified))
}

async fn health() -> &'static str {
    "ok"
}

async fn cache_health(State(state): State<HttpState>) -> Response {
    Json(state.cache.stats()).into_response()
}
