//! EVE Profit Market Data Crate
//!
//! This crate fetches live orders, daily history and type descriptions from
//! the EVE Swagger Interface (ESI) and aggregates them into per-item price
//! summaries.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Process-wide rate limiting with a token bucket
//! - Retrying fetches with a fixed failure classification
//! - Concurrent multi-item aggregation with fail-fast error handling
//! - A TTL cache of aggregated responses
//!
//! # Architecture
//!
//! ```text
//! +--------------------+
//! |  MarketAggregator  |  (fan-out, summaries, cache)
//! +--------------------+
//!           |  2N concurrent fetches
//!           v
//! +--------------------+     +------------------+
//! |  RetryingFetcher   | --> |   RateLimiter    |  (one token per attempt)
//! +--------------------+     +------------------+
//!           |
//!           v
//! +--------------------+
//! |     Transport      |  (reqwest in production)
//! +--------------------+
//! ```
//!
//! # Core Types
//!
//! - [`MarketAggregator`] - Entry point for multi-item market data
//! - [`RetryingFetcher`] - Rate-limited, retrying single-endpoint fetch
//! - [`RateLimiter`] - Shared token bucket
//! - [`RequestContext`] - Caller cancellation scope and deadline
//! - [`AggregateRequest`] / [`AggregateResponse`] - Aggregation input and output
//! - [`ItemPriceSummary`] - Best bid/ask and volumes for one item

pub mod aggregator;
pub mod config;
pub mod context;
pub mod errors;
pub mod models;
pub mod provider;
pub mod rate_limiter;

pub use aggregator::{summarize, AggregateCache, CacheKey, MarketAggregator};
pub use config::MarketDataConfig;
pub use context::RequestContext;
pub use errors::{MarketDataError, Result, RetryClass};
pub use models::{
    AggregateRequest, AggregateResponse, ItemPriceSummary, MarketHistoryPoint, MarketOrder,
    OrderId, RegionId, TypeId, TypeInfo,
};
pub use provider::{
    EndpointKind, FetchRequest, HttpRequest, HttpResponse, ReqwestTransport, RetryingFetcher,
    Transport, TransportError,
};
pub use rate_limiter::{RateLimiter, RatePermit};

// Re-export tokio-util's token so callers need not depend on it directly.
pub use tokio_util::sync::CancellationToken;
