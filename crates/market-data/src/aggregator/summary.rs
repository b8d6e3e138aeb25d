//! Buy/sell summary over an order book.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{ItemPriceSummary, MarketOrder, TypeId};

/// Summarize the orders of one item.
///
/// `buy_max` is the best bid and `sell_min` the best ask, each zero when
/// that side of the book is empty. Volumes are summed remaining volume.
/// The result does not depend on the order of `orders`.
pub fn summarize(
    type_id: TypeId,
    orders: &[MarketOrder],
    last_updated: DateTime<Utc>,
) -> ItemPriceSummary {
    let mut buy_max = Decimal::ZERO;
    let mut sell_min: Option<Decimal> = None;
    let mut buy_volume: i64 = 0;
    let mut sell_volume: i64 = 0;

    for order in orders {
        let remaining = i64::from(order.volume_remain);
        if order.is_buy_order {
            buy_max = buy_max.max(order.price);
            buy_volume += remaining;
        } else {
            sell_min = Some(match sell_min {
                Some(current) => current.min(order.price),
                None => order.price,
            });
            sell_volume += remaining;
        }
    }

    ItemPriceSummary {
        type_id,
        buy_max,
        sell_min: sell_min.unwrap_or(Decimal::ZERO),
        buy_volume,
        sell_volume,
        last_updated,
    }
}
