use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One day of regional trading history for an item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketHistoryPoint {
    pub date: NaiveDate,
    pub average: Decimal,
    pub highest: Decimal,
    pub lowest: Decimal,
    pub order_count: i64,
    pub volume: i64,
}
