mod archive;
mod database;
mod provider;

pub use archive::extract_mmdb;
pub use database::GeoDatabase;
pub use provider::MaxmindProvider;

#[cfg(test)]
pub(crate) mod testdata;
