use crate::source::RefreshSource;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{self, Duration};
use tracing::info;

/// Lock-free counters for one refresh loop.
#[derive(Debug, Default)]
pub struct RefreshStats {
    probes: AtomicU64,
    probe_failures: AtomicU64,
    unchanged: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub probes: u64,
    pub probe_failures: u64,
    pub unchanged: u64,
    pub loads: u64,
    pub load_failures: u64,
}

impl RefreshStats {
    pub fn inc_probes(&self) {
        self.probes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_probe_failures(&self) {
        self.probe_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unchanged(&self) {
        self.unchanged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_loads(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_load_failures(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            probes: self.probes.load(Ordering::Relaxed),
            probe_failures: self.probe_failures.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
        }
    }
}

/// Periodically logs the counters of every source. Runs until aborted.
pub async fn run_logger(sources: Vec<Arc<dyn RefreshSource>>, log_interval: Duration) {
    let mut interval = time::interval(log_interval);
    // The first tick completes immediately
    interval.tick().await;
    loop {
        interval.tick().await;
        info!("STATS DUMP: {}", format_stats(&sources));
    }
}

fn format_stats(sources: &[Arc<dyn RefreshSource>]) -> String {
    let mut out = String::new();
    for source in sources {
        let status = source.status();
        let s = status.stats;
        out.push_str(&format!(
            "[{}: {:?}, entries {}, probes {} ({} failed, {} unchanged), loads {} ({} failed)] ",
            status.name,
            status.state,
            status.entries.unwrap_or(0),
            s.probes,
            s.probe_failures,
            s.unchanged,
            s.loads,
            s.load_failures
        ));
    }
    out.trim_end().to_string()
}
