use std::time::Duration;

use eveprofit_market_data::MarketDataConfig;

/// Process configuration read from the environment (and `.env`, if present).
pub struct Config {
    pub market: MarketDataConfig,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Missing keys keep the default;
    /// unparseable numbers are logged and also keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut market = MarketDataConfig::default();

        if let Some(base_url) = lookup("ESI_BASE_URL").filter(|v| !v.trim().is_empty()) {
            market = market.with_base_url(base_url.trim());
        }
        if let Some(rate) = parse_number(&lookup, "ESI_RATE_LIMIT") {
            market = market.with_rate_limit(rate);
        }
        if let Some(attempts) = parse_number(&lookup, "ESI_RETRY_ATTEMPTS") {
            market = market.with_retry_attempts(attempts);
        }
        if let Some(secs) = parse_number(&lookup, "ESI_TIMEOUT_SECONDS") {
            market = market.with_request_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_number(&lookup, "CACHE_TTL_MARKET_ORDERS") {
            market = market.with_cache_ttl(Duration::from_secs(secs));
        }
        if let Some(user_agent) = lookup("ESI_USER_AGENT").filter(|v| !v.trim().is_empty()) {
            market = market.with_user_agent(user_agent);
        }

        Self { market }
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} value {:?}, using default", key, raw);
            None
        }
    }
}
