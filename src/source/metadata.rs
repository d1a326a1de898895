use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// Result of a metadata probe: which version is upstream and where to get it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Opaque version token (the upstream publishes an md5 of the payload).
    pub fingerprint: String,
    pub download_url: String,
    pub generated_at: String,
}

impl Metadata {
    /// Reads the `md5` / `download` / `generated_on` triple published for every dataset.
    pub fn from_json(dataset: &str, info: &Value) -> Result<Self> {
        let fingerprint = required_str(dataset, info, "md5")?;
        let download_url = required_str(dataset, info, "download")?;
        Url::parse(&download_url)
            .map_err(|e| Error::malformed(dataset, format!("bad download link: {}", e)))?;

        // Some generators write epoch seconds rather than a date string
        let generated_at = match info.get("generated_on") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(Error::malformed(dataset, "missing field `generated_on`")),
        };

        Ok(Self {
            fingerprint,
            download_url,
            generated_at,
        })
    }
}

fn required_str(dataset: &str, info: &Value, field: &str) -> Result<String> {
    match info.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(_) => Err(Error::malformed(
            dataset,
            format!("field `{}` is not a non-empty string", field),
        )),
        None => Err(Error::malformed(dataset, format!("missing field `{}`", field))),
    }
}
