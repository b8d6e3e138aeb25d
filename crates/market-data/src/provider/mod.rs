//! Upstream market data API access.
//!
//! This module contains:
//! - The `Transport` trait every outbound call goes through
//! - `ReqwestTransport`, the production transport
//! - `FetchRequest`/`EndpointKind`, the endpoint descriptors
//! - `RetryingFetcher`, the rate-limited retrying fetch primitive
//!
//! # Failure classification
//!
//! | Outcome | Error | Retried? |
//! |---------|-------|----------|
//! | connection failure / timeout | `Transport` | yes |
//! | status >= 500 | `UpstreamServer` | yes |
//! | status 400..500 | `UpstreamClient` | no |
//! | body does not decode | `Decode` | no |

mod endpoint;
mod fetcher;
mod http;
#[cfg(test)]
pub(crate) mod mock;
mod traits;

pub use endpoint::{EndpointKind, FetchRequest};
pub use fetcher::RetryingFetcher;
pub use http::ReqwestTransport;
pub use traits::{HttpRequest, HttpResponse, Transport, TransportError};
