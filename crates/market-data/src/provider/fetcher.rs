//! Rate-limited, retrying fetch primitive.
//!
//! One logical fetch is a loop of attempts. Each attempt:
//! 1. takes a token from the shared [`RateLimiter`] (retries are not exempt),
//! 2. issues the call through the [`Transport`] with the fixed header set,
//! 3. classifies the outcome: transport failures and 5xx are retryable,
//!    4xx and undecodable bodies are returned at once.
//!
//! Retries follow each other without delay. Cancellation at any point ends
//! the loop with [`MarketDataError::Cancelled`].

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde::de::DeserializeOwned;

use super::endpoint::FetchRequest;
use super::http::ReqwestTransport;
use super::traits::{HttpRequest, HttpResponse, Transport};
use crate::config::MarketDataConfig;
use crate::context::RequestContext;
use crate::errors::{MarketDataError, Result, RetryClass};
use crate::models::{MarketHistoryPoint, MarketOrder, RegionId, TypeId, TypeInfo};
use crate::rate_limiter::RateLimiter;

const HEADER_USER_AGENT: &str = "User-Agent";
const HEADER_ACCEPT: &str = "Accept";
const CONTENT_TYPE_JSON: &str = "application/json";

/// Performs logical remote fetches against the market data API.
pub struct RetryingFetcher {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    base_url: String,
    user_agent: String,
    retry_limit: u32,
    request_timeout: Duration,
}

impl RetryingFetcher {
    /// Create a fetcher over an explicit transport and limiter.
    pub fn new(
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
        config: &MarketDataConfig,
    ) -> Self {
        Self {
            transport,
            limiter,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            retry_limit: config.retry_attempts,
            request_timeout: config.request_timeout,
        }
    }

    /// Create a fetcher with a `reqwest` transport and its own limiter.
    ///
    /// Must be called inside a Tokio runtime (the limiter spawns its refill task).
    pub fn from_config(config: &MarketDataConfig) -> Self {
        let transport = Arc::new(ReqwestTransport::new(config.request_timeout));
        let limiter = Arc::new(RateLimiter::new(config.requests_per_second));
        Self::new(transport, limiter, config)
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Build the outbound request for an endpoint.
    pub fn build_request(&self, request: &FetchRequest) -> HttpRequest {
        HttpRequest {
            url: format!("{}{}", self.base_url, request.path()),
            headers: vec![
                (HEADER_USER_AGENT.to_string(), self.user_agent.clone()),
                (HEADER_ACCEPT.to_string(), CONTENT_TYPE_JSON.to_string()),
            ],
        }
    }

    /// Fetch and decode one endpoint, retrying transient failures.
    ///
    /// Up to `retry_limit` additional attempts are made for retryable
    /// failures; the last such failure is returned once they run out.
    pub async fn fetch<T>(&self, ctx: &RequestContext, request: &FetchRequest) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        let http = self.build_request(request);
        let mut retries = 0;

        loop {
            match self.attempt(ctx, &http).await {
                Ok(value) => {
                    if retries > 0 {
                        debug!(
                            "Fetched {} for type {} after {} retries",
                            request.kind, request.type_id, retries
                        );
                    }
                    return Ok(value);
                }
                Err(e) if e.retry_class() == RetryClass::Retry && retries < self.retry_limit => {
                    retries += 1;
                    warn!(
                        "Fetching {} for type {} failed: {}, retry {}/{}",
                        request.kind, request.type_id, e, retries, self.retry_limit
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One attempt: token, call, classify.
    async fn attempt<T>(&self, ctx: &RequestContext, http: &HttpRequest) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        let _permit = self.limiter.acquire(ctx).await?;

        let call = tokio::time::timeout(self.request_timeout, self.transport.fetch(http));
        let response = tokio::select! {
            biased;
            () = ctx.cancelled() => return Err(MarketDataError::Cancelled),
            outcome = call => match outcome {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(MarketDataError::Transport(e.to_string())),
                Err(_) => {
                    return Err(MarketDataError::Transport(format!(
                        "request to {} timed out after {:?}",
                        http.url, self.request_timeout
                    )))
                }
            },
        };

        Self::classify(&http.url, response)
    }

    fn classify<T: DeserializeOwned>(url: &str, response: HttpResponse) -> Result<T> {
        if response.status >= 500 {
            return Err(MarketDataError::UpstreamServer {
                status: response.status,
                url: url.to_string(),
            });
        }
        if response.status >= 400 {
            return Err(MarketDataError::UpstreamClient {
                status: response.status,
                url: url.to_string(),
            });
        }

        serde_json::from_slice(&response.body).map_err(|e| MarketDataError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Live orders for one item in one region.
    pub async fn get_market_orders(
        &self,
        ctx: &RequestContext,
        region_id: RegionId,
        type_id: TypeId,
    ) -> Result<Vec<MarketOrder>> {
        self.fetch(ctx, &FetchRequest::orders(region_id, type_id))
            .await
    }

    /// Daily history for one item in one region.
    pub async fn get_market_history(
        &self,
        ctx: &RequestContext,
        region_id: RegionId,
        type_id: TypeId,
    ) -> Result<Vec<MarketHistoryPoint>> {
        self.fetch(ctx, &FetchRequest::history(region_id, type_id))
            .await
    }

    /// Static description of an item type.
    pub async fn get_type_info(&self, ctx: &RequestContext, type_id: TypeId) -> Result<TypeInfo> {
        self.fetch(ctx, &FetchRequest::type_info(type_id)).await
    }
}
