use crate::error::{Error, Result};
use crate::source::{Dataset, Record};
use maxminddb::{MaxMindDBError, Reader};
use serde_json::Value;
use std::net::IpAddr;
use tracing::debug;

/// In-memory MaxMind database. Records are decoded generically, so City, Country and ASN
/// editions all work.
pub struct GeoDatabase {
    reader: Reader<Vec<u8>>,
}

impl GeoDatabase {
    pub fn from_bytes(dataset: &str, mmdb: Vec<u8>) -> Result<Self> {
        let reader = Reader::from_source(mmdb).map_err(|e| Error::parse(dataset, e))?;
        Ok(Self { reader })
    }

    pub fn database_type(&self) -> &str {
        &self.reader.metadata.database_type
    }

    pub fn build_epoch(&self) -> u64 {
        self.reader.metadata.build_epoch
    }
}

impl Dataset for GeoDatabase {
    fn lookup(&self, ip: IpAddr) -> Record {
        // The reader would walk an IPv4-only tree with the IPv6 bits and land on an IPv4 range
        if ip.is_ipv6() && self.reader.metadata.ip_version == 4 {
            return Record::new();
        }
        match self.reader.lookup::<Value>(ip) {
            Ok(Value::Object(record)) => record,
            Ok(_) => Record::new(),
            Err(MaxMindDBError::AddressNotFoundError(_)) => Record::new(),
            Err(e) => {
                debug!("{} lookup for {} failed: {}", self.database_type(), ip, e);
                Record::new()
            }
        }
    }

    fn entry_count(&self) -> usize {
        self.reader.metadata.node_count as usize
    }
}
