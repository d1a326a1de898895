use super::data_source::DataSource;
use super::state::RefreshState;
use super::traits::Provider;
use futures::FutureExt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What one probe/load cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Loaded,
    Unchanged,
    ProbeFailed,
    LoadFailed,
}

impl<P: Provider> DataSource<P> {
    /// Runs one cycle. A forced cycle loads whatever the probe reports, skipping the
    /// fingerprint comparison; the first cycle of a source is always forced.
    pub async fn refresh_once(&self, force: bool) -> RefreshOutcome {
        let force = force || !self.is_loaded();
        if !force {
            self.set_state(RefreshState::Checking);
        }

        let latest = match self.probe().await {
            Ok(metadata) => {
                self.last_error.store(None);
                metadata
            }
            Err(e) => {
                self.set_state(RefreshState::FailedProbe);
                warn!(
                    "{} metadata probe failed, retrying next cycle: {}",
                    self.name(),
                    e
                );
                self.last_error.store(Some(Arc::new(e.to_string())));
                self.settle();
                return RefreshOutcome::ProbeFailed;
            }
        };

        if !force {
            if let Some(current) = self.fingerprint() {
                if self.provider.same_version(&current, &latest.fingerprint) {
                    debug!("{} dataset unchanged ({})", self.name(), current);
                    self.stats.inc_unchanged();
                    self.settle();
                    return RefreshOutcome::Unchanged;
                }
                info!(
                    "{} fingerprint changed: {} -> {}",
                    self.name(),
                    current,
                    latest.fingerprint
                );
            }
        }

        match self.load(&latest).await {
            Ok(()) => RefreshOutcome::Loaded,
            Err(e) => {
                error!(
                    "Failed to load {} dataset, keeping previous generation: {}",
                    self.name(),
                    e
                );
                self.last_error.store(Some(Arc::new(e.to_string())));
                self.settle();
                RefreshOutcome::LoadFailed
            }
        }
    }

    /// Leaves a failure or check state for the resting one.
    fn settle(&self) {
        if self.is_loaded() {
            self.set_state(RefreshState::Idle);
        } else {
            self.set_state(RefreshState::Uninitialized);
        }
    }

    /// The refresh loop. Runs until its task is aborted.
    pub async fn run(&self) {
        info!(
            "Starting {} update loop (every {:?})",
            self.name(),
            self.schedule.interval
        );
        let mut force = false;
        loop {
            if self.refresh_once(force).await == RefreshOutcome::Loaded {
                // Requests made before or during this load are already satisfied
                let _ = self.force.notified().now_or_never();
            }

            let delay = if self.is_loaded() {
                self.schedule.interval
            } else {
                self.schedule.bootstrap_retry
            };
            debug!(
                "{} update loop sleeping for {} minutes",
                self.name(),
                delay.as_secs() / 60
            );

            force = tokio::select! {
                _ = tokio::time::sleep(delay) => false,
                _ = self.force.notified() => {
                    info!("Forced {} refresh triggered", self.name());
                    true
                }
            };
        }
    }
}
