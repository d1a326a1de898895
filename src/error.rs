use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the refresh machinery. None of these ever reach a lookup caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("upstream {url} unavailable: {reason}")]
    UpstreamUnavailable { url: String, reason: String },

    #[error("malformed metadata for {dataset}: {reason}")]
    MalformedMetadata { dataset: String, reason: String },

    #[error("failed to parse {dataset} payload: {reason}")]
    ParseFailure { dataset: String, reason: String },

    #[error("data sources not ready after {0:?}")]
    Timeout(Duration),
}

impl Error {
    pub(crate) fn unavailable(url: &str, reason: impl ToString) -> Self {
        Error::UpstreamUnavailable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(dataset: &str, reason: impl ToString) -> Self {
        Error::MalformedMetadata {
            dataset: dataset.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn parse(dataset: &str, reason: impl ToString) -> Self {
        Error::ParseFailure {
            dataset: dataset.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Per-key problems while answering a lookup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("invalid IP address: {0:?}")]
    InvalidAddress(String),
}
