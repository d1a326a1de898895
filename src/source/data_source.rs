use super::metadata::Metadata;
use super::state::{Lookup, RefreshState};
use super::traits::{Dataset, Provider, Record, RefreshSource};
use crate::error::{LookupError, Result};
use crate::stats::{RefreshStats, StatsSnapshot};
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// How often a source re-probes upstream.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub interval: Duration,
    /// Delay between attempts while no dataset has ever loaded.
    pub bootstrap_retry: Duration,
}

impl Schedule {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            bootstrap_retry: interval,
        }
    }

    pub fn with_bootstrap_retry(mut self, retry: Duration) -> Self {
        self.bootstrap_retry = retry;
        self
    }
}

/// One successful load: the dataset together with the version it was built from.
#[derive(Debug)]
pub struct Generation<D> {
    pub dataset: D,
    pub metadata: Metadata,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub name: String,
    pub state: RefreshState,
    pub fingerprint: Option<String>,
    pub generated_at: Option<String>,
    pub last_loaded_at: Option<DateTime<Utc>>,
    pub entries: Option<usize>,
    /// Most recently probed download location, possibly newer than the loaded one.
    pub source_url: Option<String>,
    pub last_error: Option<String>,
    pub refresh_interval_secs: u64,
    pub stats: StatsSnapshot,
}

/// Self-refreshing container for one dataset kind.
///
/// Readers load the current `Generation` through a single atomic pointer. A refresh builds
/// the next generation completely before storing it, so a lookup sees either the old or the
/// new dataset and never waits on the refresh loop.
pub struct DataSource<P: Provider> {
    pub(super) provider: P,
    pub(super) schedule: Schedule,
    active: ArcSwapOption<Generation<P::Dataset>>,
    latest_probe: ArcSwapOption<Metadata>,
    pub(super) last_error: ArcSwapOption<String>,
    state: AtomicU8,
    pub(crate) stats: RefreshStats,
    loaded_tx: watch::Sender<bool>,
    pub(super) force: Notify,
}

impl<P: Provider> DataSource<P> {
    pub fn new(provider: P, schedule: Schedule) -> Self {
        let (loaded_tx, _) = watch::channel(false);
        Self {
            provider,
            schedule,
            active: ArcSwapOption::empty(),
            latest_probe: ArcSwapOption::empty(),
            last_error: ArcSwapOption::empty(),
            state: AtomicU8::new(RefreshState::Uninitialized as u8),
            stats: RefreshStats::default(),
            loaded_tx,
            force: Notify::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn state(&self) -> RefreshState {
        RefreshState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(super) fn set_state(&self, state: RefreshState) {
        debug!("{} refresh state -> {:?}", self.name(), state);
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn is_loaded(&self) -> bool {
        self.active.load().is_some()
    }

    /// Currently published generation, if any. Holding it keeps that generation alive.
    pub fn snapshot(&self) -> Option<Arc<Generation<P::Dataset>>> {
        self.active.load_full()
    }

    pub fn fingerprint(&self) -> Option<String> {
        self.active
            .load_full()
            .map(|generation| generation.metadata.fingerprint.clone())
    }

    pub fn last_loaded_at(&self) -> Option<DateTime<Utc>> {
        self.active
            .load_full()
            .map(|generation| generation.loaded_at)
    }

    /// Queries upstream metadata and remembers the advertised source location.
    pub async fn probe(&self) -> Result<Metadata> {
        self.stats.inc_probes();
        match self.provider.probe().await {
            Ok(metadata) => {
                self.latest_probe.store(Some(Arc::new(metadata.clone())));
                Ok(metadata)
            }
            Err(e) => {
                self.stats.inc_probe_failures();
                Err(e)
            }
        }
    }

    /// Downloads and parses the payload described by `metadata`, then publishes it.
    ///
    /// On any failure the active generation is left untouched.
    pub async fn load(&self, metadata: &Metadata) -> Result<()> {
        self.set_state(RefreshState::Loading);
        info!(
            "Downloading {} dataset {} from {}",
            self.name(),
            metadata.fingerprint,
            metadata.download_url
        );

        let dataset = match self.provider.fetch(metadata).await {
            Ok(dataset) => dataset,
            Err(e) => {
                self.stats.inc_load_failures();
                self.set_state(RefreshState::FailedLoad);
                return Err(e);
            }
        };

        let entries = dataset.entry_count();
        self.active.store(Some(Arc::new(Generation {
            dataset,
            metadata: metadata.clone(),
            loaded_at: Utc::now(),
        })));
        self.loaded_tx.send_replace(true);
        self.stats.inc_loads();
        self.last_error.store(None);
        self.set_state(RefreshState::Idle);

        info!(
            "Active {} dataset updated ({} entries, generated {}).",
            self.name(),
            entries,
            metadata.generated_at
        );
        Ok(())
    }

    /// Answers from the current generation without waiting on any refresh.
    pub fn lookup(&self, key: &str) -> std::result::Result<Lookup<Record>, LookupError> {
        let guard = self.active.load();
        let Some(generation) = &*guard else {
            return Ok(Lookup::NotReady);
        };
        let ip = parse_key(key)?;
        Ok(Lookup::Ready(generation.dataset.lookup(ip)))
    }

    /// Resolves once the first generation has been published.
    pub fn subscribe_loaded(&self) -> watch::Receiver<bool> {
        self.loaded_tx.subscribe()
    }

    /// Makes the loop reload now, bypassing the fingerprint comparison. A request made
    /// before the loop starts, or while a load is in flight, is satisfied by that load.
    pub fn force_refresh(&self) {
        self.force.notify_one();
    }

    pub fn status(&self) -> SourceStatus {
        let active = self.active.load_full();
        let probed = self.latest_probe.load_full();
        SourceStatus {
            name: self.name().to_string(),
            state: self.state(),
            fingerprint: active.as_ref().map(|g| g.metadata.fingerprint.clone()),
            generated_at: active.as_ref().map(|g| g.metadata.generated_at.clone()),
            last_loaded_at: active.as_ref().map(|g| g.loaded_at),
            entries: active.as_ref().map(|g| g.dataset.entry_count()),
            source_url: probed.map(|m| m.download_url.clone()),
            last_error: self.last_error.load_full().map(|e| e.to_string()),
            refresh_interval_secs: self.schedule.interval.as_secs(),
            stats: self.stats.snapshot(),
        }
    }
}

fn parse_key(key: &str) -> std::result::Result<IpAddr, LookupError> {
    key.trim()
        .parse()
        .map_err(|_| LookupError::InvalidAddress(key.to_string()))
}

impl<P: Provider> RefreshSource for DataSource<P> {
    fn name(&self) -> &str {
        DataSource::name(self)
    }

    fn is_loaded(&self) -> bool {
        DataSource::is_loaded(self)
    }

    fn subscribe_loaded(&self) -> watch::Receiver<bool> {
        DataSource::subscribe_loaded(self)
    }

    fn lookup(&self, key: &str) -> std::result::Result<Lookup<Record>, LookupError> {
        DataSource::lookup(self, key)
    }

    fn status(&self) -> SourceStatus {
        DataSource::status(self)
    }

    fn force_refresh(&self) {
        DataSource::force_refresh(self)
    }

    fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }
}
