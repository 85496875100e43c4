//! Blocking HTTP transport to a tether-server.
//!
//! `GET {base}/adv[/{thp}]` fetches an advertisement and
//! `POST {base}/rec/{thp}` performs a recovery. Non-2xx answers are errors.

use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

use crate::protocol::RecoveryHandler;

/// Default bound on a single request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Failures talking to the server.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection, timeout or body failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{url} answered {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },
}

/// Recovery handler and advertisement fetcher for one server.
#[derive(Debug, Clone)]
pub struct HttpRecovery {
    base: String,
    client: Client,
}

impl HttpRecovery {
    /// Transport to the server at `base` (e.g. `http://tang.local:8080`)
    /// with [`DEFAULT_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// - `Http`: the HTTP client could not be built
    pub fn new(base: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeout(base, DEFAULT_TIMEOUT)
    }

    /// Transport with a custom per-request timeout.
    ///
    /// # Errors
    ///
    /// - `Http`: the HTTP client could not be built
    pub fn with_timeout(base: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let base = base.into().trim_end_matches('/').to_string();
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base, client })
    }

    /// Fetch the advertisement signed by `thumbprint`, or the default one.
    ///
    /// The bytes are unverified; pass them to
    /// [`crate::ClientProtocol::parse_advertisement`].
    ///
    /// # Errors
    ///
    /// - `Http` / `Status`: the request failed
    pub fn fetch_advertisement(&self, thumbprint: Option<&str>) -> Result<Vec<u8>, TransportError> {
        let url = match thumbprint {
            Some(thp) => format!("{}/adv/{thp}", self.base),
            None => format!("{}/adv", self.base),
        };
        tracing::debug!(%url, "fetching advertisement");
        let response = self.client.get(&url).send()?;
        read_body(url, response)
    }
}

impl RecoveryHandler for HttpRecovery {
    type Error = TransportError;

    fn recover(&self, thumbprint: &str, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        let url = format!("{}/rec/{thumbprint}", self.base);
        tracing::debug!(%url, "sending recovery request");
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/jwk+json")
            .body(request.to_vec())
            .send()?;
        read_body(url, response)
    }
}

fn read_body(url: String, response: reqwest::blocking::Response) -> Result<Vec<u8>, TransportError> {
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status { url, status: status.as_u16() });
    }
    Ok(response.bytes()?.to_vec())
}
