//! Access to external manuscript archives
//!
//! Imports read a JSON metadata record and download the raw image. Both go
//! through [`RemoteSource`] so the import logic can run against a canned
//! source in tests.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use transcriba_common::{Error, Result};

/// Read access to the archive an object is imported from
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch and parse the JSON document at `url`
    async fn fetch_json(&self, url: &str) -> Result<Value>;

    /// Fetch the raw bytes at `url`
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Production [`RemoteSource`] backed by reqwest
pub struct HttpRemoteSource {
    client: reqwest::Client,
}

impl HttpRemoteSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("Transcriba/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        debug!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Remote(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        self.get(url)
            .await?
            .json()
            .await
            .map_err(|_| Error::WrongFormat)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|e| Error::Remote(format!("Reading {} failed: {}", url, e)))?;
        Ok(bytes.to_vec())
    }
}
