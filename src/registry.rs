use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::maxmind::MaxmindProvider;
use crate::source::{DataSource, Provider, RefreshSource, Schedule, SourceStatus};
use crate::stats;
use crate::tor::TorProvider;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Where a source's answer lands in a merged lookup result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Merge {
    /// Fields go straight into the top level.
    Flatten,
    /// The whole answer is placed under one field.
    Nested(String),
}

pub(crate) struct Member {
    pub(crate) source: Arc<dyn RefreshSource>,
    pub(crate) merge: Merge,
}

/// Ordered set of data sources sharing one readiness gate.
pub struct Registry {
    members: Vec<Member>,
    ready: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    stats_interval: Option<Duration>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            ready: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
            stats_interval: None,
        }
    }

    /// Standard set: the configured MaxMind edition flattened into the result and the
    /// Tor node list under `threat`.
    pub fn from_config(config: &Config, fetcher: Arc<dyn Fetcher>) -> Self {
        let mut registry = Self::new();

        if config.maxmind.enable {
            let provider = MaxmindProvider::new(
                fetcher.clone(),
                config.maxmind.metadata_url.clone(),
                config.maxmind.edition.clone(),
            );
            let interval = Duration::from_secs(config.maxmind.refresh_interval_secs);
            let schedule = Schedule::every(interval).with_bootstrap_retry(config.bootstrap_retry());
            registry.register(DataSource::new(provider, schedule), Merge::Flatten);
        }

        if config.tor.enable {
            let provider = TorProvider::new(fetcher, config.tor.metadata_url.clone());
            let interval = Duration::from_secs(config.tor.refresh_interval_secs);
            let schedule = Schedule::every(interval).with_bootstrap_retry(config.bootstrap_retry());
            registry.register(
                DataSource::new(provider, schedule),
                Merge::Nested("threat".to_string()),
            );
        }

        if config.stats.enable {
            registry.log_stats_every(Duration::from_secs(config.stats.log_interval_seconds));
        }

        registry
    }

    /// Adds a source and returns a typed handle to it.
    pub fn register<P: Provider>(
        &mut self,
        source: DataSource<P>,
        merge: Merge,
    ) -> Arc<DataSource<P>> {
        let source = Arc::new(source);
        self.members.push(Member {
            source: source.clone(),
            merge,
        });
        source
    }

    pub fn log_stats_every(&mut self, interval: Duration) {
        self.stats_interval = Some(interval);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|m| m.source.name().to_string())
            .collect()
    }

    pub(crate) fn members(&self) -> &[Member] {
        &self.members
    }

    /// Spawns one refresh task per source on the current runtime. Does not wait.
    pub fn start_all(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if !tasks.is_empty() {
            warn!("Refresh loops already running, ignoring start request");
            return;
        }

        for member in &self.members {
            tasks.push(member.source.clone().spawn());
        }

        if let Some(interval) = self.stats_interval {
            let sources = self.members.iter().map(|m| m.source.clone()).collect();
            tasks.push(tokio::spawn(stats::run_logger(sources, interval)));
        }
        info!("Started {} refresh loop(s)", self.members.len());
    }

    /// Waits until every source has completed its first successful load.
    ///
    /// With no timeout this waits indefinitely; sources keep retrying in the background.
    pub async fn await_ready(&self, timeout: Option<Duration>) -> Result<()> {
        let waits = self.members.iter().map(|member| {
            let mut loaded = member.source.subscribe_loaded();
            async move {
                // The sender lives as long as the source, which we hold
                let _ = loaded.wait_for(|loaded| *loaded).await;
            }
        });
        let all = join_all(waits);

        match timeout {
            Some(limit) => {
                tokio::time::timeout(limit, all)
                    .await
                    .map_err(|_| Error::Timeout(limit))?;
            }
            None => {
                all.await;
            }
        }

        if !self.ready.swap(true, Ordering::AcqRel) {
            info!("Finished downloading databases.");
        }
        Ok(())
    }

    /// True once every source has loaded at least once. Never reverts.
    pub fn is_ready(&self) -> bool {
        if self.ready.load(Ordering::Acquire) {
            return true;
        }
        if self.members.iter().all(|m| m.source.is_loaded()) {
            self.ready.store(true, Ordering::Release);
            return true;
        }
        false
    }

    pub fn statuses(&self) -> Vec<SourceStatus> {
        self.members.iter().map(|m| m.source.status()).collect()
    }

    pub fn force_refresh_all(&self) {
        for member in &self.members {
            member.source.force_refresh();
        }
    }

    /// Cancels the refresh loops. Loaded datasets stay queryable.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
