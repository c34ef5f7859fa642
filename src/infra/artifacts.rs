//! Snapshot artifact storage.
//!
//! Artifacts are plain files, replaced wholesale. Their generation time is
//! never embedded in the payload; it rides on file metadata locally and on
//! the `Last-Modified` header when artifacts are fetched over HTTP, which is
//! how the seeder learns a snapshot's age.

use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, header::LAST_MODIFIED};
use time::{OffsetDateTime, PrimitiveDateTime, format_description::BorrowedFormatItem};
use tokio::task;
use url::Url;

use crate::application::sources::{ArtifactError, ArtifactFetcher, ArtifactPayload, ArtifactWriter};
use crate::domain::ResourceDescriptor;

use super::error::InfraError;

// IMF-fixdate, the only format worth emitting or accepting here.
const HTTP_DATE: &[BorrowedFormatItem<'static>] = time::macros::format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

pub fn format_http_date(datetime: OffsetDateTime) -> Option<String> {
    datetime.format(&HTTP_DATE).ok()
}

pub fn parse_http_date(value: &str) -> Option<OffsetDateTime> {
    PrimitiveDateTime::parse(value.trim(), &HTTP_DATE)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// Local artifact directory: written by the snapshot exporter, read back by
/// the seeder in single-node deployments, and served under `/snapshots`.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: PathBuf) -> Result<Self, InfraError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, ArtifactError> {
        let candidate = Path::new(relative);
        let traversal_free = candidate
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if relative.is_empty() || !traversal_free {
            return Err(ArtifactError::InvalidPath {
                path: relative.to_string(),
            });
        }
        Ok(self.root.join(candidate))
    }

    /// Load an artifact by file name, with its modification time for the
    /// `Last-Modified` response header.
    pub async fn open(&self, relative: &str) -> Result<(Bytes, Option<SystemTime>), ArtifactError> {
        let path = self.resolve(relative)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => Bytes::from(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound);
            }
            Err(err) => return Err(ArtifactError::Io(err)),
        };
        let modified = tokio::fs::metadata(&path)
            .await
            .ok()
            .and_then(|metadata| metadata.modified().ok());
        Ok((bytes, modified))
    }
}

#[async_trait]
impl ArtifactWriter for FsArtifactStore {
    async fn write(
        &self,
        descriptor: &ResourceDescriptor,
        payload: &[u8],
    ) -> Result<u64, ArtifactError> {
        let path = self.resolve(descriptor.artifact_file)?;
        let root = self.root.clone();
        let payload = payload.to_vec();

        // Write to a temp file in the same directory and rename over the
        // target, so a crashed run never leaves a truncated artifact behind.
        let size = task::spawn_blocking(move || -> Result<u64, std::io::Error> {
            use std::io::Write;

            let mut tmp = tempfile::NamedTempFile::new_in(&root)?;
            tmp.write_all(&payload)?;
            tmp.flush()?;
            tmp.persist(&path).map_err(|err| err.error)?;
            Ok(payload.len() as u64)
        })
        .await
        .map_err(|err| ArtifactError::Transport(format!("artifact write task failed: {err}")))??;

        Ok(size)
    }
}

#[async_trait]
impl ArtifactFetcher for FsArtifactStore {
    async fn fetch(
        &self,
        descriptor: &ResourceDescriptor,
    ) -> Result<ArtifactPayload, ArtifactError> {
        let (bytes, modified) = self.open(descriptor.artifact_file).await?;
        let age = modified.and_then(|modified| SystemTime::now().duration_since(modified).ok());
        Ok(ArtifactPayload { bytes, age })
    }
}

/// Artifact fetcher for deployments where snapshots are published behind a
/// static file host or CDN.
pub struct HttpArtifactFetcher {
    client: reqwest::Client,
    base: Url,
}

impl HttpArtifactFetcher {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, InfraError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self { client, base })
    }
}

#[async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    async fn fetch(
        &self,
        descriptor: &ResourceDescriptor,
    ) -> Result<ArtifactPayload, ArtifactError> {
        let url = self
            .base
            .join(descriptor.artifact_file)
            .map_err(|err| ArtifactError::Transport(err.to_string()))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ArtifactError::Transport(err.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ArtifactError::NotFound);
        }
        if !response.status().is_success() {
            return Err(ArtifactError::Transport(format!(
                "artifact host returned status {}",
                response.status()
            )));
        }

        let age = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_http_date)
            .and_then(|modified| {
                let delta = OffsetDateTime::now_utc() - modified;
                Duration::try_from(delta).ok()
            });

        let bytes = response
            .bytes()
            .await
            .map_err(|err| ArtifactError::Transport(err.to_string()))?;

        Ok(ArtifactPayload { bytes, age })
    }
}
