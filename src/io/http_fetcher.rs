use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use url::Url;

use super::ChunkFetcher;
use crate::error::FetchError;

/// Default request timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// HTTP(S) implementation of [`ChunkFetcher`].
///
/// Issues a single GET per address. The client is cheap to clone and shares
/// its connection pool.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    identifier: String,
}

impl HttpFetcher {
    /// Create a fetcher with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Connection {
                address: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            identifier: "http".to_string(),
        })
    }

    /// Create a fetcher around an existing client.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            identifier: "http".to_string(),
        }
    }
}

#[async_trait]
impl ChunkFetcher for HttpFetcher {
    async fn fetch(&self, address: &str) -> Result<Bytes, FetchError> {
        let url = Url::parse(address).map_err(|e| FetchError::InvalidAddress {
            address: address.to_string(),
            message: e.to_string(),
        })?;

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Connection {
                address: address.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                address: address.to_string(),
                status: status.as_u16(),
            });
        }

        resp.bytes().await.map_err(|e| FetchError::Connection {
            address: address.to_string(),
            message: e.to_string(),
        })
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
