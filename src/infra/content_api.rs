//! Reqwest-backed Content API client.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::ACCEPT;
use url::Url;

use crate::application::sources::{ContentApiError, ContentReader};
use crate::domain::ResourceDescriptor;

use super::error::InfraError;

/// Live reader against the Content API.
///
/// Every call carries an explicit timeout; the revalidation path never waits
/// on ambient client defaults.
pub struct HttpContentReader {
    client: reqwest::Client,
    base: Url,
    timeout: Duration,
}

impl HttpContentReader {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, InfraError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self {
            client,
            base,
            timeout,
        })
    }

    fn endpoint_url(
        &self,
        descriptor: &ResourceDescriptor,
        params: Option<&str>,
    ) -> Result<Url, ContentApiError> {
        let mut url = self
            .base
            .join(descriptor.endpoint.trim_start_matches('/'))
            .map_err(|err| ContentApiError::Transport(err.to_string()))?;
        if let Some(params) = params {
            url.set_query(Some(params));
        }
        Ok(url)
    }
}

#[async_trait]
impl ContentReader for HttpContentReader {
    async fn fetch(
        &self,
        descriptor: &ResourceDescriptor,
        params: Option<&str>,
    ) -> Result<Bytes, ContentApiError> {
        let url = self.endpoint_url(descriptor, params)?;

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ContentApiError::Timeout(self.timeout)
                } else {
                    ContentApiError::Transport(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContentApiError::Status {
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|err| ContentApiError::Transport(err.to_string()))
    }
}
