use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::history::MarketHistoryPoint;
use super::order::MarketOrder;
use super::summary::ItemPriceSummary;
use super::types::{RegionId, TypeId};
use crate::errors::{MarketDataError, Result};

/// A multi-item market data request for one region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRequest {
    pub region_id: RegionId,
    pub type_ids: Vec<TypeId>,
}

impl AggregateRequest {
    pub fn new(region_id: RegionId, type_ids: impl Into<Vec<TypeId>>) -> Self {
        Self {
            region_id,
            type_ids: type_ids.into(),
        }
    }

    /// Rejects requests that must never reach the network.
    pub fn validate(&self) -> Result<()> {
        if self.type_ids.is_empty() {
            return Err(MarketDataError::Validation(
                "no type IDs provided".to_string(),
            ));
        }
        if self.region_id <= 0 {
            return Err(MarketDataError::Validation(format!(
                "invalid region ID: {}",
                self.region_id
            )));
        }
        Ok(())
    }

    /// The item ids as a sorted set, with duplicates removed.
    pub fn unique_type_ids(&self) -> BTreeSet<TypeId> {
        self.type_ids.iter().copied().collect()
    }
}

/// Aggregated market data for every item of an [`AggregateRequest`].
///
/// Once built the response is shared as an immutable snapshot; cache hits
/// hand out the same allocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateResponse {
    pub region_id: RegionId,
    pub data: BTreeMap<TypeId, ItemPriceSummary>,
    pub orders: BTreeMap<TypeId, Vec<MarketOrder>>,
    pub history: BTreeMap<TypeId, Vec<MarketHistoryPoint>>,
    pub computed_at: DateTime<Utc>,
}
