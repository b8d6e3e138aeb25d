//! Client configuration.

use std::time::Duration;

/// Public market data host.
pub const DEFAULT_BASE_URL: &str = "https://esi.evetech.net";

/// Upstream allowance: 150 requests per second.
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 150;

/// Additional attempts after the first for retryable failures.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Per-call timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifetime of a cached aggregate.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Identifying header sent on every outbound call.
pub const DEFAULT_USER_AGENT: &str = "EVE-Profit2/1.0";

/// Settings for the rate limiter, fetcher and aggregator.
#[derive(Clone, Debug)]
pub struct MarketDataConfig {
    pub base_url: String,
    pub requests_per_second: u32,
    pub retry_attempts: u32,
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub user_agent: String,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl MarketDataConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_rate_limit(mut self, requests_per_second: u32) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
