use crate::error::{Error, Result};
use crate::source::{Dataset, Record};
use rustc_hash::FxHashSet;
use serde_json::Value;
use std::net::{IpAddr, SocketAddr};
use tracing::{debug, info};

/// Set of known Tor relay/exit addresses.
#[derive(Debug, Default)]
pub struct TorNodeList {
    nodes: FxHashSet<IpAddr>,
}

impl TorNodeList {
    /// Parses a node list: one `ip:port` (or bare IP) per line.
    pub fn parse(text: &str) -> Result<Self> {
        let mut nodes = FxHashSet::default();
        let mut skipped = 0usize;

        for line in text.lines() {
            match Self::parse_line(line) {
                Some(Ok(ip)) => {
                    nodes.insert(ip);
                }
                Some(Err(())) => {
                    debug!("Skipping unparsable tor node line {:?}", line);
                    skipped += 1;
                }
                None => {}
            }
        }

        if nodes.is_empty() {
            return Err(Error::parse(
                super::NAME,
                format!("no node addresses found ({} unparsable lines)", skipped),
            ));
        }

        info!(
            "Parsed {} distinct tor nodes ({} lines skipped)",
            nodes.len(),
            skipped
        );
        Ok(Self { nodes })
    }

    fn parse_line(line: &str) -> Option<std::result::Result<IpAddr, ()>> {
        let line = line.trim();
        // Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        if let Ok(addr) = line.parse::<SocketAddr>() {
            return Some(Ok(addr.ip()));
        }
        Some(line.parse::<IpAddr>().map_err(|_| ()))
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        self.nodes.contains(&ip)
    }
}

impl Dataset for TorNodeList {
    fn lookup(&self, ip: IpAddr) -> Record {
        let mut record = Record::new();
        record.insert("is_tor".to_string(), Value::Bool(self.contains(ip)));
        record
    }

    fn entry_count(&self) -> usize {
        self.nodes.len()
    }
}
