use super::data_source::SourceStatus;
use super::metadata::Metadata;
use super::state::Lookup;
use crate::error::{LookupError, Result};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Field map returned for one address by one dataset.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// The "Hot Path": one immutable, fully parsed dataset generation.
pub trait Dataset: Send + Sync + 'static {
    fn lookup(&self, ip: IpAddr) -> Record;

    /// Number of entries, for logs and status only.
    fn entry_count(&self) -> usize;
}

/// The "Control Plane" for one dataset kind: how to probe, download and parse it.
#[async_trait::async_trait]
pub trait Provider: Send + Sync + 'static {
    type Dataset: Dataset;

    fn name(&self) -> &str;

    /// Fetches metadata only, never the payload.
    async fn probe(&self) -> Result<Metadata>;

    /// Downloads the payload named by `metadata` and parses it completely.
    async fn fetch(&self, metadata: &Metadata) -> Result<Self::Dataset>;

    fn same_version(&self, current: &str, latest: &str) -> bool {
        current == latest
    }
}

/// Type-erased view of a `DataSource` for the registry.
pub trait RefreshSource: Send + Sync {
    fn name(&self) -> &str;
    fn is_loaded(&self) -> bool;
    fn subscribe_loaded(&self) -> watch::Receiver<bool>;
    fn lookup(&self, key: &str) -> std::result::Result<Lookup<Record>, LookupError>;
    fn status(&self) -> SourceStatus;
    fn force_refresh(&self);
    fn spawn(self: Arc<Self>) -> JoinHandle<()>;
}
