pub mod config;
pub mod error;
pub mod fetch;
pub mod init;
pub mod maxmind;
pub mod query;
pub mod registry;
pub mod source;
pub mod stats;
pub mod tor;

pub use error::{Error, LookupError, Result};
pub use query::IpDb;
pub use registry::{Merge, Registry};
pub use source::{DataSource, Dataset, Lookup, Metadata, Provider, Record, RefreshState};
