//! Error types for the fetch module.

use thiserror::Error;

/// Transport-level failure of a single GET.
///
/// HTTP error statuses are NOT errors here: a non-200 response is surfaced
/// through [`super::FetchResponse::status`] so the pipeline can record the
/// stage it failed at. Only failures that produce no response at all land in
/// this enum.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The per-request deadline expired.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },
}

impl FetchError {
    /// Wraps a reqwest error, classifying deadline expiry separately.
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Network {
                url: url.to_string(),
                source,
            }
        }
    }
}
