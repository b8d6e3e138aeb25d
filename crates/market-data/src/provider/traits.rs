//! Transport trait definitions.
//!
//! This module defines the `Transport` trait the fetcher issues its calls
//! through. The production implementation wraps `reqwest`; tests plug in
//! scripted doubles.

use async_trait::async_trait;
use thiserror::Error;

/// A fully built outbound GET request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Raw upstream response: status plus undecoded body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// The call never produced a response (connection refused, reset, timeout).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        Self(error.to_string())
    }
}

/// Issues a single remote call.
///
/// Implementations must not retry or rate limit; the fetcher does both.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use eveprofit_market_data::provider::{HttpRequest, HttpResponse, Transport, TransportError};
///
/// struct AlwaysEmpty;
///
/// #[async_trait]
/// impl Transport for AlwaysEmpty {
///     async fn fetch(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
///         Ok(HttpResponse::new(200, "[]"))
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}
