//! Query cache key definitions.
//!
//! A cache key is a resource id plus, for parameterized reads, the
//! canonicalized query string. The fingerprint hash is used for log and
//! metric labels, never for identity.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::domain::ResourceId;

/// Key of one query cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: ResourceId,
    /// Canonicalized query string for parameterized reads, `None` for the
    /// bare collection read.
    params: Option<Box<str>>,
}

impl QueryKey {
    /// Key for the bare (unparameterized) read of a resource.
    pub fn bare(resource: ResourceId) -> Self {
        Self {
            resource,
            params: None,
        }
    }

    /// Key for a parameterized read. The raw query string is canonicalized
    /// so that `b=2&a=1` and `a=1&b=2` share one entry.
    pub fn with_params(resource: ResourceId, query: &str) -> Self {
        Self {
            resource,
            params: canonicalize_params(query).map(String::into_boxed_str),
        }
    }

    pub fn params(&self) -> Option<&str> {
        self.params.as_deref()
    }

    /// Stable fingerprint of the parameter set, for observability labels.
    pub fn fingerprint(&self) -> u64 {
        hash_value(&self.params)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.params() {
            Some(params) => write!(f, "{}?{params}", self.resource),
            None => write!(f, "{}", self.resource),
        }
    }
}

/// Sort query pairs into a canonical order; empty input collapses to `None`.
pub fn canonicalize_params(query: &str) -> Option<String> {
    let mut pairs: Vec<&str> = query.split('&').filter(|pair| !pair.is_empty()).collect();
    if pairs.is_empty() {
        return None;
    }
    pairs.sort_unstable();
    Some(pairs.join("&"))
}

/// Compute a hash for any hashable value.
pub fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &'static str) -> ResourceId {
        ResourceId::new(id)
    }

    #[test]
    fn bare_key_has_no_params() {
        let key = QueryKey::bare(resource("products"));
        assert!(key.params().is_none());
        assert_eq!(key.to_string(), "products");
    }

    #[test]
    fn params_are_canonicalized() {
        let a = QueryKey::with_params(resource("products"), "category=pumps&page=2");
        let b = QueryKey::with_params(resource("products"), "page=2&category=pumps");
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn empty_query_collapses_to_bare() {
        let key = QueryKey::with_params(resource("products"), "");
        assert_eq!(key, QueryKey::bare(resource("products")));
    }

    #[test]
    fn different_params_produce_different_keys() {
        let a = QueryKey::with_params(resource("products"), "page=1");
        let b = QueryKey::with_params(resource("products"), "page=2");
        assert_ne!(a, b);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn same_params_on_different_resources_differ() {
        let a = QueryKey::with_params(resource("products"), "page=1");
        let b = QueryKey::with_params(resource("blogposts"), "page=1");
        assert_ne!(a, b);
    }
}
