use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{OrderId, TypeId};

/// A live market order as returned by the regional orders endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketOrder {
    pub order_id: OrderId,
    pub type_id: TypeId,
    pub location_id: i64,
    pub system_id: i32,
    pub volume_total: i32,
    pub volume_remain: i32,
    pub min_volume: i32,
    pub price: Decimal,
    pub is_buy_order: bool,
    pub duration: i32,
    pub issued: DateTime<Utc>,
    pub range: String,
}
