//! Synchronous lookup surface over a running `Registry`.

use crate::config::Config;
use crate::init::init_registry;
use crate::registry::{Merge, Registry};
use crate::source::{Lookup, Record, SourceStatus};
use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

/// Query handle combining every registered dataset into one answer per address.
///
/// Lookups never block and never fail: before every source has loaded they return an
/// empty map, afterwards they answer from whatever generation is currently published.
pub struct IpDb {
    registry: Arc<Registry>,
    // Present when the handle owns the runtime its refresh loops run on
    runtime: Option<Runtime>,
}

impl IpDb {
    /// Wraps a registry whose loops are driven by the caller's runtime.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            runtime: None,
        }
    }

    /// Starts the configured datasets on a private runtime and blocks until all of them
    /// have loaded (or the configured readiness timeout passes).
    pub fn launch(config: &Config) -> Result<Self> {
        let registry = init_registry(config)?;
        Self::launch_with(registry, config.ready_timeout())
    }

    pub fn launch_with(registry: Arc<Registry>, ready_timeout: Option<Duration>) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("ip-db-refresh")
            .enable_all()
            .build()
            .context("Failed to build refresh runtime")?;

        {
            let _guard = runtime.enter();
            registry.start_all();
        }

        info!("Waiting for all databases to finish downloading...");
        let db = Self {
            registry,
            runtime: Some(runtime),
        };
        if let Some(runtime) = &db.runtime {
            runtime.block_on(db.registry.await_ready(ready_timeout))?;
        }
        Ok(db)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn is_ready(&self) -> bool {
        self.registry.is_ready()
    }

    pub fn status(&self) -> Vec<SourceStatus> {
        self.registry.statuses()
    }

    /// Queries every dataset for `ip` and merges the answers.
    pub fn lookup_all(&self, ip: &str) -> Record {
        let mut merged = Record::new();
        if !self.registry.is_ready() {
            return merged;
        }

        for member in self.registry.members() {
            let answer = match member.source.lookup(ip) {
                Ok(Lookup::Ready(record)) => record,
                Ok(Lookup::NotReady) => Record::new(),
                Err(e) => {
                    debug!("{} contributes nothing: {}", member.source.name(), e);
                    Record::new()
                }
            };

            match &member.merge {
                Merge::Flatten => merged.extend(answer),
                Merge::Nested(field) => {
                    merged.insert(field.clone(), Value::Object(answer));
                }
            }
        }
        merged
    }
}

impl Drop for IpDb {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            self.registry.shutdown();
            // Safe to call from inside another runtime, unlike a plain drop
            runtime.shutdown_background();
        }
    }
}
