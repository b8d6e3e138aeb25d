use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::TypeId;

/// Best buy/sell prices and open volume for one item in one region.
///
/// Always recomputed as a whole from the current order book; never patched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemPriceSummary {
    pub type_id: TypeId,
    /// Highest buy order price, zero when there are no buy orders
    pub buy_max: Decimal,
    /// Lowest sell order price, zero when there are no sell orders
    pub sell_min: Decimal,
    /// Remaining volume across all buy orders
    pub buy_volume: i64,
    /// Remaining volume across all sell orders
    pub sell_volume: i64,
    pub last_updated: DateTime<Utc>,
}
