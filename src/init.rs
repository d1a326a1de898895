//! Initialization helpers for the application startup.

use crate::config::Config;
use crate::fetch::HttpFetcher;
use crate::registry::Registry;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Sets up the tracing subscriber with the configured filters.
pub fn setup_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(logging_filter(config)));

    // A second init (tests, embedding applications) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}

fn logging_filter(config: &Config) -> String {
    let mut filter = config.logging.level.clone();

    // Keep transport chatter quiet unless explicitly requested
    for noisy in ["hyper", "reqwest"] {
        if !filter.contains(noisy) {
            filter.push_str(&format!(",{}=warn", noisy));
        }
    }
    filter
}

/// Builds the HTTP-backed registry for the configured datasets.
pub fn init_registry(config: &Config) -> Result<Arc<Registry>> {
    let fetcher = HttpFetcher::new(&config.http).context("Failed to build HTTP client")?;
    let registry = Registry::from_config(config, Arc::new(fetcher));
    info!(
        "Registered {} data source(s): {}",
        registry.len(),
        registry.names().join(", ")
    );
    Ok(Arc::new(registry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_filter_quiets_transport() {
        let config = Config::default();
        assert_eq!(logging_filter(&config), "info,hyper=warn,reqwest=warn");
    }

    #[test]
    fn test_logging_filter_respects_explicit_targets() {
        let mut config = Config::default();
        config.logging.level = "debug,reqwest=trace".to_string();
        assert_eq!(logging_filter(&config), "debug,reqwest=trace,hyper=warn");
    }
}
