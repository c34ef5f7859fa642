//! Collaborator seams for the read-freshness pipeline.
//!
//! The pipeline only ever talks to two external parties: the Content API
//! (live reads) and artifact storage (static snapshot files). Both are
//! expressed as trait objects so the cache, seeder, and snapshot exporter can
//! be exercised against in-memory doubles.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::domain::ResourceDescriptor;

/// Live read access to the Content API.
///
/// This is the live accessor of a resource descriptor: one endpoint per
/// descriptor, returning the payload verbatim. Implementations apply an
/// explicit per-call timeout; callers never wait on ambient client defaults.
#[async_trait]
pub trait ContentReader: Send + Sync {
    async fn fetch(
        &self,
        descriptor: &ResourceDescriptor,
        params: Option<&str>,
    ) -> Result<Bytes, ContentApiError>;
}

/// A snapshot artifact as loaded from storage.
#[derive(Debug, Clone)]
pub struct ArtifactPayload {
    pub bytes: Bytes,
    /// Observable age of the artifact, derived from file metadata (mtime or
    /// `Last-Modified`), never from the payload itself. `None` when storage
    /// exposes no usable timestamp.
    pub age: Option<Duration>,
}

/// Read access to snapshot artifacts.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, descriptor: &ResourceDescriptor) -> Result<ArtifactPayload, ArtifactError>;
}

/// Write access to snapshot artifacts. Each write replaces the artifact
/// wholesale; there are no partial updates.
#[async_trait]
pub trait ArtifactWriter: Send + Sync {
    /// Persist the payload for the descriptor, returning the written size in
    /// bytes.
    async fn write(
        &self,
        descriptor: &ResourceDescriptor,
        payload: &[u8],
    ) -> Result<u64, ArtifactError>;
}

/// Failure of a live read against the Content API.
#[derive(Debug, Error)]
pub enum ContentApiError {
    #[error("content api returned status {status}")]
    Status { status: u16 },
    #[error("content api call timed out after {0:?}")]
    Timeout(Duration),
    #[error("content api transport failure: {0}")]
    Transport(String),
}

/// Failure to load or store a snapshot artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found")]
    NotFound,
    #[error("artifact path `{path}` is not valid")]
    InvalidPath { path: String },
    #[error("artifact io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact transport failure: {0}")]
    Transport(String),
}
