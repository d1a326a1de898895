use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::io::Read;
use tar::Archive;
use tracing::{debug, info};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Pulls the `.mmdb` file out of a downloaded payload.
///
/// Upstream ships `.tar.gz` archives; a payload without the gzip magic is taken to be a
/// bare database already.
pub fn extract_mmdb(dataset: &str, payload: &[u8]) -> Result<Vec<u8>> {
    if !payload.starts_with(&GZIP_MAGIC) {
        debug!("{} payload is not gzip, using it as a raw database", dataset);
        return Ok(payload.to_vec());
    }

    let mut archive = Archive::new(GzDecoder::new(payload));
    let entries = archive
        .entries()
        .map_err(|e| Error::parse(dataset, format!("unreadable archive: {}", e)))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| Error::parse(dataset, format!("bad tar entry: {}", e)))?;
        let path = entry
            .path()
            .map_err(|e| Error::parse(dataset, format!("bad tar path: {}", e)))?
            .into_owned();

        if path.extension().and_then(|ext| ext.to_str()) != Some("mmdb") {
            continue;
        }

        let expected = entry.size();
        let mut mmdb = Vec::new();
        entry
            .read_to_end(&mut mmdb)
            .map_err(|e| Error::parse(dataset, format!("truncated {}: {}", path.display(), e)))?;
        if mmdb.len() as u64 != expected {
            return Err(Error::parse(
                dataset,
                format!(
                    "truncated {}: {} of {} bytes",
                    path.display(),
                    mmdb.len(),
                    expected
                ),
            ));
        }
        info!(
            "Extracted {} from archive ({} bytes)",
            path.display(),
            mmdb.len()
        );
        return Ok(mmdb);
    }

    Err(Error::parse(dataset, "no .mmdb file in archive"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maxmind::testdata::tar_gz;

    #[test]
    fn test_extracts_nested_mmdb() {
        let archive = tar_gz(&[
            ("GeoLite2-City_20180807/LICENSE.txt", b"license".as_slice()),
            ("GeoLite2-City_20180807/GeoLite2-City.mmdb", b"MMDB".as_slice()),
        ]);
        assert_eq!(extract_mmdb("geo", &archive).unwrap(), b"MMDB");
    }

    #[test]
    fn test_archive_without_mmdb_fails() {
        let archive = tar_gz(&[("README.txt", b"nothing".as_slice())]);
        let err = extract_mmdb("geo", &archive).unwrap_err();
        assert!(matches!(err, Error::ParseFailure { .. }));
    }

    #[test]
    fn test_truncated_gzip_fails() {
        let archive = tar_gz(&[("db/GeoLite2-City.mmdb", vec![7u8; 4096].as_slice())]);
        let err = extract_mmdb("geo", &archive[..archive.len() / 2]).unwrap_err();
        assert!(matches!(err, Error::ParseFailure { .. }));
    }

    #[test]
    fn test_raw_payload_passes_through() {
        assert_eq!(extract_mmdb("geo", b"raw").unwrap(), b"raw");
    }
}
