//! Edge cache policy.
//!
//! A pure per-request decision attached to the public read routes: GET
//! responses are marked publicly cacheable for `s-maxage` seconds and may be
//! served stale for `stale-while-revalidate` further seconds while an
//! intermediary refreshes in the background. Non-GET responses carry no
//! directive at all, so mutations are never cached by an intermediary.
//!
//! The policy has no state and no failure mode of its own; it only shapes how
//! external caches treat responses, independently of the in-memory query
//! cache and of whether the response itself errored.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, header::CACHE_CONTROL},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

const DEFAULT_S_MAXAGE_SECONDS: u32 = 300;
const DEFAULT_STALE_WHILE_REVALIDATE_SECONDS: u32 = 600;

/// Wire-level freshness window emitted on public GET responses.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct EdgePolicy {
    pub s_maxage_seconds: u32,
    pub stale_while_revalidate_seconds: u32,
}

impl Default for EdgePolicy {
    fn default() -> Self {
        Self {
            s_maxage_seconds: DEFAULT_S_MAXAGE_SECONDS,
            stale_while_revalidate_seconds: DEFAULT_STALE_WHILE_REVALIDATE_SECONDS,
        }
    }
}

impl EdgePolicy {
    /// The caching directive for a request method, `None` for any mutation.
    pub fn cache_control(&self, method: &Method) -> Option<HeaderValue> {
        if method != Method::GET {
            return None;
        }
        let directive = format!(
            "public, s-maxage={}, stale-while-revalidate={}",
            self.s_maxage_seconds, self.stale_while_revalidate_seconds
        );
        // Digits and ASCII punctuation only, so the header value is always valid.
        HeaderValue::from_str(&directive).ok()
    }
}

/// Axum layer applying the edge policy to every response on a route group.
pub async fn edge_cache_layer(
    State(policy): State<EdgePolicy>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let directive = policy.cache_control(request.method());
    let mut response = next.run(request).await;
    if let Some(value) = directive {
        response.headers_mut().insert(CACHE_CONTROL, value);
    }
    response
}
