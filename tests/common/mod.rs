#![allow(dead_code)]

use ip_db::error::{Error, Result};
use ip_db::fetch::Fetcher;
use ip_db::{Dataset, Metadata, Provider, Record};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Serves fixed bodies by URL; anything else is a 404.
#[derive(Default)]
pub struct MemoryFetcher {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryFetcher {
    pub fn set(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), body.into());
    }
}

#[async_trait::async_trait]
impl Fetcher for MemoryFetcher {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.bodies
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::UpstreamUnavailable {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            })
    }
}

/// Answers the same record for every address.
pub struct FixedRecord(pub Record);

impl Dataset for FixedRecord {
    fn lookup(&self, _ip: IpAddr) -> Record {
        self.0.clone()
    }

    fn entry_count(&self) -> usize {
        self.0.len()
    }
}

pub fn record(value: Value) -> Record {
    value.as_object().cloned().expect("record must be an object")
}

/// Provider whose upstream version, answer and failures are driven by the test.
pub struct ScriptedProvider {
    name: String,
    fingerprint: Mutex<String>,
    answer: Mutex<Record>,
    pub fail_probe: AtomicBool,
    pub fail_fetch: AtomicBool,
    pub fetches: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(name: &str, answer: Value) -> Self {
        Self {
            name: name.to_string(),
            fingerprint: Mutex::new("v1".to_string()),
            answer: Mutex::new(record(answer)),
            fail_probe: AtomicBool::new(false),
            fail_fetch: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing(self) -> Self {
        self.fail_probe.store(true, Ordering::SeqCst);
        self
    }

    pub fn publish(&self, fingerprint: &str, answer: Value) {
        *self.fingerprint.lock().unwrap() = fingerprint.to_string();
        *self.answer.lock().unwrap() = record(answer);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    type Dataset = FixedRecord;

    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<Metadata> {
        if self.fail_probe.load(Ordering::SeqCst) {
            return Err(Error::UpstreamUnavailable {
                url: format!("https://meta.test/{}", self.name),
                reason: "connection refused".to_string(),
            });
        }
        Ok(Metadata {
            fingerprint: self.fingerprint.lock().unwrap().clone(),
            download_url: format!("https://dl.test/{}", self.name),
            generated_at: "2018-08-01".to_string(),
        })
    }

    async fn fetch(&self, _metadata: &Metadata) -> Result<FixedRecord> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Error::ParseFailure {
                dataset: self.name.clone(),
                reason: "corrupt payload".to_string(),
            });
        }
        Ok(FixedRecord(self.answer.lock().unwrap().clone()))
    }
}

pub const TOR_META: &str = "https://meta.test/tor.json";
pub const TOR_LIST: &str = "https://dl.test/tor.txt";

/// Publishes a tor node list and its metadata on `fetcher`.
pub fn publish_tor(fetcher: &MemoryFetcher, md5: &str, nodes: &[&str]) {
    let meta = json!({"md5": md5, "download": TOR_LIST, "generated_on": "2018-08-01"});
    fetcher.set(TOR_META, meta.to_string());
    fetcher.set(TOR_LIST, nodes.join("\n"));
}
