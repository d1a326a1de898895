use super::matcher::TorNodeList;
use crate::error::{Error, Result};
use crate::fetch::{fetch_metadata, Fetcher};
use crate::source::{Metadata, Provider};
use std::sync::Arc;
use tracing::info;

pub struct TorProvider {
    fetcher: Arc<dyn Fetcher>,
    metadata_url: String,
}

impl TorProvider {
    pub fn new(fetcher: Arc<dyn Fetcher>, metadata_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            metadata_url: metadata_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl Provider for TorProvider {
    type Dataset = TorNodeList;

    fn name(&self) -> &str {
        super::NAME
    }

    async fn probe(&self) -> Result<Metadata> {
        let info = fetch_metadata(self.fetcher.as_ref(), super::NAME, &self.metadata_url).await?;
        Metadata::from_json(super::NAME, &info)
    }

    async fn fetch(&self, metadata: &Metadata) -> Result<TorNodeList> {
        info!("Downloading latest tor database");
        let body = self.fetcher.get(&metadata.download_url).await?;
        let text = String::from_utf8(body).map_err(|e| Error::parse(super::NAME, e))?;
        TorNodeList::parse(&text)
    }
}
