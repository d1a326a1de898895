use crate::config::HttpConfig;
use crate::error::{Error, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Byte transport used for metadata probes and payload downloads.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::unavailable(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::unavailable(url, format!("HTTP {}", status)));
        }

        let body = resp.bytes().await.map_err(|e| Error::unavailable(url, e))?;
        Ok(body.to_vec())
    }
}

/// Fetches and decodes a JSON metadata document.
pub async fn fetch_metadata(fetcher: &dyn Fetcher, dataset: &str, url: &str) -> Result<Value> {
    let body = fetcher.get(url).await?;
    serde_json::from_slice(&body).map_err(|e| Error::malformed(dataset, e))
}
