use super::archive::extract_mmdb;
use super::database::GeoDatabase;
use crate::error::{Error, Result};
use crate::fetch::{fetch_metadata, Fetcher};
use crate::source::{Metadata, Provider};
use std::sync::Arc;
use tracing::info;

/// MaxMind database provider for one product edition (e.g. `lite_city`).
///
/// The metadata document lists every edition side by side:
/// `{"lite_city": {"md5": .., "download": .., "generated_on": ..}, "lite_country": {..}}`.
pub struct MaxmindProvider {
    fetcher: Arc<dyn Fetcher>,
    metadata_url: String,
    edition: String,
    name: String,
}

impl MaxmindProvider {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        metadata_url: impl Into<String>,
        edition: impl Into<String>,
    ) -> Self {
        let edition = edition.into();
        Self {
            fetcher,
            metadata_url: metadata_url.into(),
            name: format!("geo-{}", edition.replace('_', "-")),
            edition,
        }
    }

    pub fn edition(&self) -> &str {
        &self.edition
    }
}

#[async_trait::async_trait]
impl Provider for MaxmindProvider {
    type Dataset = GeoDatabase;

    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<Metadata> {
        let info = fetch_metadata(self.fetcher.as_ref(), &self.name, &self.metadata_url).await?;
        let Some(edition) = info.get(&self.edition) else {
            let available: Vec<&str> = info
                .as_object()
                .map(|editions| editions.keys().map(String::as_str).collect())
                .unwrap_or_default();
            return Err(Error::malformed(
                &self.name,
                format!(
                    "edition `{}` not published (available: {})",
                    self.edition,
                    available.join(", ")
                ),
            ));
        };
        Metadata::from_json(&self.name, edition)
    }

    async fn fetch(&self, metadata: &Metadata) -> Result<GeoDatabase> {
        info!("Downloading Maxmind {} database.", self.edition);
        let payload = self.fetcher.get(&metadata.download_url).await?;

        // Decompression and index setup are CPU bound; keep them off the runtime workers
        let name = self.name.clone();
        tokio::task::spawn_blocking(move || {
            let mmdb = extract_mmdb(&name, &payload)?;
            GeoDatabase::from_bytes(&name, mmdb)
        })
        .await
        .map_err(|e| Error::parse(&self.name, e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::StaticFetcher;
    use crate::maxmind::testdata::{tar_gz, tiny_mmdb};
    use crate::source::{DataSource, Dataset, Lookup, Schedule};
    use serde_json::json;
    use std::time::Duration;

    const META: &str = "https://meta.test/maxmind.json";
    const CITY: &str = "https://dl.test/GeoLite2-City.tar.gz";

    fn metadata() -> String {
        json!({
            "lite_city": {"md5": "c1", "download": CITY, "generated_on": "2018-08-07"},
            "lite_country": {"md5": "k1", "download": "https://dl.test/country.tar.gz", "generated_on": "2018-08-07"},
        })
        .to_string()
    }

    fn city_archive() -> Vec<u8> {
        let mmdb = tiny_mmdb(&json!({"country": {"iso_code": "US"}}));
        tar_gz(&[("GeoLite2-City_20180807/GeoLite2-City.mmdb", mmdb.as_slice())])
    }

    #[test]
    fn test_name_follows_edition() {
        let provider = MaxmindProvider::new(Arc::new(StaticFetcher::default()), META, "lite_city");
        assert_eq!(provider.name(), "geo-lite-city");
        assert_eq!(provider.edition(), "lite_city");
    }

    #[tokio::test]
    async fn test_probe_selects_edition() {
        let fetcher = StaticFetcher::default().with(META, metadata());
        let provider = MaxmindProvider::new(Arc::new(fetcher), META, "lite_city");
        let metadata = provider.probe().await.unwrap();
        assert_eq!(metadata.fingerprint, "c1");
        assert_eq!(metadata.download_url, CITY);
    }

    #[tokio::test]
    async fn test_unknown_edition_is_malformed() {
        let fetcher = StaticFetcher::default().with(META, metadata());
        let provider = MaxmindProvider::new(Arc::new(fetcher), META, "enterprise");
        let err = provider.probe().await.unwrap_err();
        assert!(matches!(err, Error::MalformedMetadata { .. }));
        assert!(err.to_string().contains("lite_country"));
    }

    #[tokio::test]
    async fn test_fetch_extracts_and_parses_archive() {
        let fetcher = StaticFetcher::default()
            .with(META, metadata())
            .with(CITY, city_archive());
        let provider = MaxmindProvider::new(Arc::new(fetcher), META, "lite_city");
        let metadata = provider.probe().await.unwrap();
        let db = provider.fetch(&metadata).await.unwrap();

        let record = db.lookup("203.0.113.5".parse().unwrap());
        assert_eq!(record["country"]["iso_code"], "US");
    }

    #[tokio::test]
    async fn test_corrupt_archive_keeps_previous_database() {
        let fetcher = Arc::new(
            StaticFetcher::default()
                .with(META, metadata())
                .with(CITY, city_archive()),
        );
        let source = DataSource::new(
            MaxmindProvider::new(fetcher.clone(), META, "lite_city"),
            Schedule::every(Duration::from_secs(86400)),
        );
        source.refresh_once(false).await;
        assert_eq!(source.fingerprint().as_deref(), Some("c1"));

        fetcher.set(
            META,
            json!({"lite_city": {"md5": "c2", "download": CITY, "generated_on": "2018-08-14"}})
                .to_string(),
        );
        fetcher.set(CITY, tar_gz(&[("README.txt", b"moved".as_slice())]));
        source.refresh_once(false).await;

        assert_eq!(source.fingerprint().as_deref(), Some("c1"));
        let Lookup::Ready(record) = source.lookup("203.0.113.5").unwrap() else {
            panic!("dataset should still be loaded");
        };
        assert_eq!(record["country"]["iso_code"], "US");
    }
}
