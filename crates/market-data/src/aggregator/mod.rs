//! Multi-item market data aggregation.
//!
//! A request for N items in one region fans out into 2N concurrent fetches
//! (orders and history per item) sharing one rate limiter and one
//! cancellation scope. The first failure abandons the whole request; on
//! success every item is summarized and the response is cached for the
//! configured TTL.

mod cache;
mod summary;

pub use cache::{AggregateCache, CacheKey};
pub use summary::summarize;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info};
use tokio::task::JoinSet;

use crate::config::MarketDataConfig;
use crate::context::RequestContext;
use crate::errors::{MarketDataError, Result};
use crate::models::{
    AggregateRequest, AggregateResponse, MarketHistoryPoint, MarketOrder, RegionId, TypeId,
};
use crate::provider::{EndpointKind, RetryingFetcher};

type OrdersByType = BTreeMap<TypeId, Vec<MarketOrder>>;
type HistoryByType = BTreeMap<TypeId, Vec<MarketHistoryPoint>>;

/// Result of one spawned sub-fetch.
enum SubFetch {
    Orders(TypeId, Vec<MarketOrder>),
    History(TypeId, Vec<MarketHistoryPoint>),
}

/// Serves aggregated market data, memoizing results per (region, item set).
pub struct MarketAggregator {
    fetcher: Arc<RetryingFetcher>,
    cache: AggregateCache,
}

impl MarketAggregator {
    pub fn new(fetcher: Arc<RetryingFetcher>, cache_ttl: Duration) -> Self {
        Self {
            fetcher,
            cache: AggregateCache::new(cache_ttl),
        }
    }

    /// Build the full stack (reqwest transport, limiter, fetcher) from config.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn from_config(config: &MarketDataConfig) -> Self {
        Self::new(
            Arc::new(RetryingFetcher::from_config(config)),
            config.cache_ttl,
        )
    }

    pub fn fetcher(&self) -> &Arc<RetryingFetcher> {
        &self.fetcher
    }

    /// Aggregated orders, history and price summaries for every requested item.
    ///
    /// Validation happens before any network access. A live cache entry is
    /// returned as-is without fetching. Any sub-fetch failure fails the whole
    /// call and nothing is cached.
    pub async fn get_market_data(
        &self,
        ctx: &RequestContext,
        request: &AggregateRequest,
    ) -> Result<Arc<AggregateResponse>> {
        request.validate()?;

        let type_ids = request.unique_type_ids();
        let key = CacheKey::new(request.region_id, &type_ids);

        if let Some(cached) = self.cache.get(&key).await {
            debug!(
                "Aggregate cache hit for region {} ({} types)",
                request.region_id,
                type_ids.len()
            );
            return Ok(cached);
        }

        let (orders, history) = self.fetch_all(ctx, request.region_id, &type_ids).await?;

        let completed_at = Utc::now();
        let data = type_ids
            .iter()
            .map(|&type_id| {
                let book = orders.get(&type_id).map(Vec::as_slice).unwrap_or_default();
                (type_id, summarize(type_id, book, completed_at))
            })
            .collect();

        let response = Arc::new(AggregateResponse {
            region_id: request.region_id,
            data,
            orders,
            history,
            computed_at: completed_at,
        });

        self.cache.insert(key, Arc::clone(&response)).await;

        info!(
            "Aggregated market data for {} types in region {}",
            type_ids.len(),
            request.region_id
        );

        Ok(response)
    }

    /// Drop the cached aggregate for exactly this region and item set.
    pub async fn invalidate(&self, region_id: RegionId, type_ids: &[TypeId]) -> bool {
        let type_ids: BTreeSet<TypeId> = type_ids.iter().copied().collect();
        self.cache.invalidate(&CacheKey::new(region_id, &type_ids)).await
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Number of live cached aggregates.
    pub async fn cached_entries(&self) -> usize {
        self.cache.len().await
    }

    /// Fan out orders and history fetches for every item and join them.
    async fn fetch_all(
        &self,
        ctx: &RequestContext,
        region_id: RegionId,
        type_ids: &BTreeSet<TypeId>,
    ) -> Result<(OrdersByType, HistoryByType)> {
        let scope = ctx.child();
        let mut tasks = JoinSet::new();

        for &type_id in type_ids {
            let fetcher = Arc::clone(&self.fetcher);
            let task_ctx = scope.clone();
            tasks.spawn(async move {
                fetcher
                    .get_market_orders(&task_ctx, region_id, type_id)
                    .await
                    .map(|orders| SubFetch::Orders(type_id, orders))
                    .map_err(|e| attribute(type_id, EndpointKind::Orders, e))
            });

            let fetcher = Arc::clone(&self.fetcher);
            let task_ctx = scope.clone();
            tasks.spawn(async move {
                fetcher
                    .get_market_history(&task_ctx, region_id, type_id)
                    .await
                    .map(|history| SubFetch::History(type_id, history))
                    .map_err(|e| attribute(type_id, EndpointKind::History, e))
            });
        }

        debug!(
            "Spawned {} fetches for region {}",
            tasks.len(),
            region_id
        );

        let mut orders = OrdersByType::new();
        let mut history = HistoryByType::new();

        loop {
            let joined = tokio::select! {
                biased;
                () = ctx.cancelled() => Err(MarketDataError::Cancelled),
                joined = tasks.join_next() => Ok(joined),
            };

            let outcome = match joined {
                Ok(None) => break,
                Ok(Some(Ok(outcome))) => outcome,
                Ok(Some(Err(join_error))) => Err(MarketDataError::TaskFailed(join_error.to_string())),
                Err(cancelled) => Err(cancelled),
            };

            match outcome {
                Ok(SubFetch::Orders(type_id, book)) => {
                    orders.insert(type_id, book);
                }
                Ok(SubFetch::History(type_id, days)) => {
                    history.insert(type_id, days);
                }
                Err(e) => {
                    debug!(
                        "Aborting {} outstanding fetches for region {}: {}",
                        tasks.len(),
                        region_id,
                        e
                    );
                    scope.cancel();
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        Ok((orders, history))
    }
}

/// Tag a sub-fetch failure with the item and endpoint it belongs to.
/// Cancellation stays a plain cancellation.
fn attribute(type_id: TypeId, endpoint: EndpointKind, error: MarketDataError) -> MarketDataError {
    match error {
        MarketDataError::Cancelled => MarketDataError::Cancelled,
        other => MarketDataError::Aggregate {
            type_id,
            endpoint,
            source: Box::new(other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockTransport;
    use crate::provider::{HttpRequest, HttpResponse, TransportError};
    use crate::rate_limiter::RateLimiter;
    use rust_decimal_macros::dec;
    use tokio::time::Instant;

    const REGION: RegionId = 10000002;
    const TRITANIUM: TypeId = 34;
    const PYERITE: TypeId = 35;
    const MEXALLON: TypeId = 36;

    fn order_json(order_id: i64, type_id: TypeId, price: &str, remain: i32, is_buy: bool) -> String {
        format!(
            r#"{{"order_id": {order_id}, "type_id": {type_id}, "location_id": 60003760,
                "system_id": 30000142, "volume_total": {remain}, "volume_remain": {remain},
                "min_volume": 1, "price": {price}, "is_buy_order": {is_buy}, "duration": 90,
                "issued": "2024-01-15T10:30:00Z", "range": "region"}}"#
        )
    }

    fn history_json(average: &str, volume: i64) -> String {
        format!(
            r#"[{{"date": "2024-01-14", "average": {average}, "highest": {average},
                 "lowest": {average}, "order_count": 100, "volume": {volume}}}]"#
        )
    }

    /// Upstream with a sell and a buy order plus one history day per item.
    fn market(request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let body = if request.url.contains("/orders/?type_id=34") {
            format!(
                "[{},{}]",
                order_json(1, 34, "5.50", 1000, false),
                order_json(2, 34, "5.40", 500, true)
            )
        } else if request.url.contains("/orders/?type_id=35") {
            format!(
                "[{},{}]",
                order_json(3, 35, "1.20", 2000, false),
                order_json(4, 35, "1.15", 1500, true)
            )
        } else if request.url.contains("/orders/") {
            "[]".to_string()
        } else if request.url.contains("/history/?type_id=34") {
            history_json("5.45", 100000)
        } else if request.url.contains("/history/?type_id=35") {
            history_json("1.18", 50000)
        } else {
            "[]".to_string()
        };
        Ok(HttpResponse::new(200, body))
    }

    fn aggregator(transport: Arc<MockTransport>, ttl: Duration) -> MarketAggregator {
        let config = MarketDataConfig::default().with_base_url("http://esi.test");
        let limiter = Arc::new(RateLimiter::new(config.requests_per_second));
        let fetcher = Arc::new(RetryingFetcher::new(transport, limiter, &config));
        MarketAggregator::new(fetcher, ttl)
    }

    #[tokio::test(start_paused = true)]
    async fn test_aggregates_multiple_types() {
        let transport = Arc::new(MockTransport::new(|req, _| market(req)));
        let aggregator = aggregator(transport.clone(), Duration::from_secs(300));

        let response = aggregator
            .get_market_data(
                &RequestContext::new(),
                &AggregateRequest::new(REGION, vec![TRITANIUM, PYERITE]),
            )
            .await
            .unwrap();

        assert_eq!(response.region_id, REGION);
        assert_eq!(response.data.len(), 2);
        assert_eq!(response.orders.len(), 2);
        assert_eq!(response.history.len(), 2);

        let tritanium = &response.data[&TRITANIUM];
        assert_eq!(tritanium.buy_max, dec!(5.40));
        assert_eq!(tritanium.sell_min, dec!(5.50));
        assert_eq!(tritanium.buy_volume, 500);
        assert_eq!(tritanium.sell_volume, 1000);
        assert_eq!(tritanium.last_updated, response.computed_at);

        let pyerite = &response.data[&PYERITE];
        assert_eq!(pyerite.buy_max, dec!(1.15));
        assert_eq!(pyerite.sell_min, dec!(1.20));

        assert_eq!(response.history[&TRITANIUM][0].average, dec!(5.45));
        assert_eq!(transport.calls_matching("/orders/"), 2);
        assert_eq!(transport.calls_matching("/history/"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_type_ids_makes_no_calls() {
        let transport = Arc::new(MockTransport::new(|req, _| market(req)));
        let aggregator = aggregator(transport.clone(), Duration::from_secs(300));

        let err = aggregator
            .get_market_data(&RequestContext::new(), &AggregateRequest::new(REGION, vec![]))
            .await
            .unwrap_err();

        assert!(matches!(err, MarketDataError::Validation(_)));
        assert!(err.to_string().contains("no type IDs provided"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_region_makes_no_calls() {
        let transport = Arc::new(MockTransport::new(|req, _| market(req)));
        let aggregator = aggregator(transport.clone(), Duration::from_secs(300));

        let err = aggregator
            .get_market_data(&RequestContext::new(), &AggregateRequest::new(0, vec![TRITANIUM]))
            .await
            .unwrap_err();

        assert!(matches!(err, MarketDataError::Validation(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_within_ttl_and_refetch_after() {
        let transport = Arc::new(MockTransport::new(|req, _| market(req)));
        let aggregator = aggregator(transport.clone(), Duration::from_secs(300));
        let ctx = RequestContext::new();

        let first = aggregator
            .get_market_data(&ctx, &AggregateRequest::new(REGION, vec![TRITANIUM, PYERITE]))
            .await
            .unwrap();
        assert_eq!(transport.call_count(), 4);

        // Same set, different order.
        let second = aggregator
            .get_market_data(&ctx, &AggregateRequest::new(REGION, vec![PYERITE, TRITANIUM]))
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            serde_json::to_vec(&*first).unwrap(),
            serde_json::to_vec(&*second).unwrap()
        );
        assert_eq!(transport.call_count(), 4);

        tokio::time::advance(Duration::from_secs(301)).await;

        let third = aggregator
            .get_market_data(&ctx, &AggregateRequest::new(REGION, vec![TRITANIUM, PYERITE]))
            .await
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(transport.call_count(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_type_ids_fetched_once() {
        let transport = Arc::new(MockTransport::new(|req, _| market(req)));
        let aggregator = aggregator(transport.clone(), Duration::from_secs(300));

        let response = aggregator
            .get_market_data(
                &RequestContext::new(),
                &AggregateRequest::new(REGION, vec![TRITANIUM, TRITANIUM]),
            )
            .await
            .unwrap();

        assert_eq!(response.data.len(), 1);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_failure_fails_whole_request_and_caches_nothing() {
        let transport = Arc::new(MockTransport::new(|req, _| {
            if req.url.contains("/orders/?type_id=35") {
                Ok(HttpResponse::new(404, r#"{"error":"Type not found!"}"#))
            } else {
                market(req)
            }
        }));
        let aggregator = aggregator(transport.clone(), Duration::from_secs(300));

        let err = aggregator
            .get_market_data(
                &RequestContext::new(),
                &AggregateRequest::new(REGION, vec![TRITANIUM, PYERITE, MEXALLON]),
            )
            .await
            .unwrap_err();

        match err {
            MarketDataError::Aggregate {
                type_id,
                endpoint,
                source,
            } => {
                assert_eq!(type_id, PYERITE);
                assert_eq!(endpoint, EndpointKind::Orders);
                assert!(matches!(
                    *source,
                    MarketDataError::UpstreamClient { status: 404, .. }
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(aggregator.cached_entries().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_failure_does_not_wait_for_siblings() {
        let transport = Arc::new(
            MockTransport::new(|req, _| {
                if req.url.contains("/history/?type_id=36") {
                    Ok(HttpResponse::new(400, ""))
                } else {
                    market(req)
                }
            })
            .with_delay("type_id=34", Duration::from_secs(3600))
            .with_delay("type_id=35", Duration::from_secs(3600)),
        );
        let aggregator = aggregator(transport.clone(), Duration::from_secs(300));
        let start = Instant::now();

        let result = aggregator
            .get_market_data(
                &RequestContext::new(),
                &AggregateRequest::new(REGION, vec![TRITANIUM, PYERITE, MEXALLON]),
            )
            .await;

        assert!(matches!(
            result,
            Err(MarketDataError::Aggregate { type_id: MEXALLON, .. })
        ));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_returns_immediately() {
        let transport = Arc::new(
            MockTransport::new(|req, _| market(req)).with_delay("", Duration::from_secs(3600)),
        );
        let aggregator = aggregator(transport.clone(), Duration::from_secs(300));
        let ctx = RequestContext::with_timeout(Duration::from_millis(250));
        let start = Instant::now();

        let err = aggregator
            .get_market_data(&ctx, &AggregateRequest::new(REGION, vec![TRITANIUM, PYERITE]))
            .await
            .unwrap_err();

        assert!(matches!(err, MarketDataError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(aggregator.cached_entries().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_run_concurrently() {
        let transport = Arc::new(
            MockTransport::new(|req, _| market(req)).with_delay("", Duration::from_secs(1)),
        );
        let aggregator = aggregator(transport.clone(), Duration::from_secs(300));
        let start = Instant::now();

        aggregator
            .get_market_data(
                &RequestContext::new(),
                &AggregateRequest::new(REGION, vec![TRITANIUM, PYERITE, MEXALLON]),
            )
            .await
            .unwrap();

        assert_eq!(transport.call_count(), 6);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_independent_of_completion_order() {
        let ids = vec![TRITANIUM, PYERITE, MEXALLON];

        let fast = Arc::new(MockTransport::new(|req, _| market(req)));
        let baseline = aggregator(fast, Duration::from_secs(300))
            .get_market_data(&RequestContext::new(), &AggregateRequest::new(REGION, ids.clone()))
            .await
            .unwrap();

        let skewed = Arc::new(
            MockTransport::new(|req, _| market(req))
                .with_delay("orders/?type_id=34", Duration::from_millis(900))
                .with_delay("history/?type_id=35", Duration::from_millis(600))
                .with_delay("type_id=36", Duration::from_millis(300)),
        );
        let reordered = aggregator(skewed, Duration::from_secs(300))
            .get_market_data(&RequestContext::new(), &AggregateRequest::new(REGION, ids))
            .await
            .unwrap();

        assert_eq!(baseline.orders, reordered.orders);
        assert_eq!(baseline.history, reordered.history);
        for (type_id, summary) in &baseline.data {
            let other = &reordered.data[type_id];
            assert_eq!(summary.buy_max, other.buy_max);
            assert_eq!(summary.sell_min, other.sell_min);
            assert_eq!(summary.buy_volume, other.buy_volume);
            assert_eq!(summary.sell_volume, other.sell_volume);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_refetch() {
        let transport = Arc::new(MockTransport::new(|req, _| market(req)));
        let aggregator = aggregator(transport.clone(), Duration::from_secs(300));
        let ctx = RequestContext::new();
        let request = AggregateRequest::new(REGION, vec![TRITANIUM]);

        aggregator.get_market_data(&ctx, &request).await.unwrap();
        assert_eq!(aggregator.cached_entries().await, 1);

        assert!(aggregator.invalidate(REGION, &[TRITANIUM]).await);
        aggregator.get_market_data(&ctx, &request).await.unwrap();

        assert_eq!(transport.call_count(), 4);

        aggregator.clear_cache().await;
        assert_eq!(aggregator.cached_entries().await, 0);
    }
}
