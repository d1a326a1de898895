use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub tor: TorConfig,

    #[serde(default)]
    pub maxmind: MaxmindConfig,

    #[serde(default)]
    pub updates: UpdateConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub stats: StatsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TorConfig {
    #[serde(default = "default_enable")]
    pub enable: bool,
    #[serde(default = "default_tor_metadata_url")]
    pub metadata_url: String,
    #[serde(default = "default_tor_refresh_interval")]
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MaxmindConfig {
    #[serde(default = "default_enable")]
    pub enable: bool,
    #[serde(default = "default_maxmind_metadata_url")]
    pub metadata_url: String,
    /// Key of the product variant inside the metadata document.
    #[serde(default = "default_maxmind_edition")]
    pub edition: String,
    #[serde(default = "default_maxmind_refresh_interval")]
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpdateConfig {
    #[serde(default = "default_bootstrap_retry")]
    pub bootstrap_retry_secs: u64,
    /// None waits for the first successful load indefinitely.
    #[serde(default)]
    pub ready_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StatsConfig {
    #[serde(default = "default_enable")]
    pub enable: bool,
    #[serde(default = "default_log_interval")]
    pub log_interval_seconds: u64,
}

// Defaults
fn default_enable() -> bool {
    true
}
fn default_tor_metadata_url() -> String {
    "https://ipdb-d6756.firebaseio.com/database/tor.json".to_string()
}
fn default_tor_refresh_interval() -> u64 {
    60 * 60 // one hour
}
fn default_maxmind_metadata_url() -> String {
    "https://ipdb-d6756.firebaseio.com/database/maxmind.json".to_string()
}
fn default_maxmind_edition() -> String {
    "lite_city".to_string()
}
fn default_maxmind_refresh_interval() -> u64 {
    60 * 60 * 24 // once a day
}
fn default_bootstrap_retry() -> u64 {
    30
}
fn default_http_timeout() -> u64 {
    60
}
fn default_user_agent() -> String {
    concat!("ip-db/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_interval() -> u64 {
    300
}

impl Default for TorConfig {
    fn default() -> Self {
        Self {
            enable: default_enable(),
            metadata_url: default_tor_metadata_url(),
            refresh_interval_secs: default_tor_refresh_interval(),
        }
    }
}

impl Default for MaxmindConfig {
    fn default() -> Self {
        Self {
            enable: default_enable(),
            metadata_url: default_maxmind_metadata_url(),
            edition: default_maxmind_edition(),
            refresh_interval_secs: default_maxmind_refresh_interval(),
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            bootstrap_retry_secs: default_bootstrap_retry(),
            ready_timeout_secs: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enable: default_enable(),
            log_interval_seconds: default_log_interval(),
        }
    }
}

impl Config {
    /// Reads a TOML file. Callers run this before any runtime exists.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config TOML")
    }

    pub fn ready_timeout(&self) -> Option<Duration> {
        self.updates.ready_timeout_secs.map(Duration::from_secs)
    }

    pub fn bootstrap_retry(&self) -> Duration {
        Duration::from_secs(self.updates.bootstrap_retry_secs)
    }
}
