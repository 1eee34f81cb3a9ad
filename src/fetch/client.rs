//! HTTP fetch capability.
//!
//! The pipeline only needs `GET url -> (status, bytes)`, so that is the whole
//! trait surface. Connection pooling, TLS, and redirects live inside the
//! reqwest client; tests substitute their own [`Fetcher`].

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::REFERER;
use tracing::debug;

use super::error::FetchError;

/// Default per-request deadline, matching the original two-minute socket
/// timeout this tool grew up with.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// One completed GET: status plus raw body.
///
/// Non-200 statuses are surfaced here rather than as errors so the caller
/// can tag the failing stage.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Returns true for a 200 response.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Best-effort text view of the body for regex matching. Invalid UTF-8
    /// is replaced, never fatal.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Fetch capability used by every pipeline.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Performs a GET, optionally with a Referer header.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] only for transport failures; HTTP error
    /// statuses come back as an `Ok` response.
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchResponse, FetchError>;
}

/// reqwest-backed [`Fetcher`] with a per-request deadline.
///
/// Created once and shared by all pipelines to reuse the connection pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher whose requests are abandoned after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the client cannot be constructed (TLS
    /// backend initialization, essentially).
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("stripfetch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchResponse, FetchError> {
        let mut request = self.client.get(url);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        debug!(url, status, bytes = body.len(), "fetched");
        Ok(FetchResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_success_only_for_200() {
        let ok = FetchResponse {
            status: 200,
            body: Vec::new(),
        };
        assert!(ok.is_success());
        for status in [204, 301, 404, 500] {
            let resp = FetchResponse {
                status,
                body: Vec::new(),
            };
            assert!(!resp.is_success(), "status {status}");
        }
    }

    #[test]
    fn test_response_text_is_lossy() {
        let resp = FetchResponse {
            status: 200,
            body: vec![b'h', b'i', 0xff, b'!'],
        };
        assert_eq!(resp.text(), "hi\u{fffd}!");
    }
}
