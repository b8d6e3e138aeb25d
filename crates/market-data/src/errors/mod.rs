//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

use crate::models::TypeId;
use crate::provider::EndpointKind;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MarketDataError>;

/// Errors that can occur during market data operations.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which determines whether the fetcher repeats the attempt.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The request was malformed (empty item list, non-positive region).
    /// Raised before any network access.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The caller's cancellation token or deadline fired while waiting
    /// for a rate token or a response.
    #[error("Request cancelled")]
    Cancelled,

    /// The rate limiter was shut down while the request was waiting.
    #[error("Rate limiter has been shut down")]
    Shutdown,

    /// Connection failure or per-call timeout.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The upstream answered with a 5xx status.
    #[error("Upstream server error: status {status} from {url}")]
    UpstreamServer {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// The upstream answered with a 4xx status.
    #[error("Upstream client error: status {status} from {url}")]
    UpstreamClient {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// The response body did not match the expected shape.
    #[error("Failed to decode response from {url}: {message}")]
    Decode {
        /// Requested URL
        url: String,
        /// Decoder message
        message: String,
    },

    /// A sub-fetch of a multi-item aggregation failed; the whole aggregate
    /// was abandoned.
    #[error("Failed to get {endpoint} for type {type_id}: {source}")]
    Aggregate {
        /// Item whose fetch failed
        type_id: TypeId,
        /// Endpoint that failed
        endpoint: EndpointKind,
        /// Underlying failure
        #[source]
        source: Box<MarketDataError>,
    },

    /// A spawned sub-fetch panicked or was aborted unexpectedly.
    #[error("Fetch task failed: {0}")]
    TaskFailed(String),
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use eveprofit_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::UpstreamServer { status: 502, url: "x".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::Retry);
    ///
    /// let error = MarketDataError::UpstreamClient { status: 404, url: "x".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Transport(_) | Self::UpstreamServer { .. } => RetryClass::Retry,

            Self::Validation(_)
            | Self::Cancelled
            | Self::Shutdown
            | Self::UpstreamClient { .. }
            | Self::Decode { .. }
            | Self::Aggregate { .. }
            | Self::TaskFailed(_) => RetryClass::Never,
        }
    }

    /// True when this error, or the error it wraps, is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Aggregate { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}
