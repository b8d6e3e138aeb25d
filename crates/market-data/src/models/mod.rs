//! Market data models
//!
//! This module contains the core data types for market data operations:
//! - `types` - Type aliases for common identifiers (TypeId, RegionId, OrderId)
//! - `order` - Live market orders (MarketOrder)
//! - `history` - Daily trading history (MarketHistoryPoint)
//! - `type_info` - Static item type description (TypeInfo)
//! - `summary` - Derived buy/sell summary (ItemPriceSummary)
//! - `aggregate` - Multi-item request and response (AggregateRequest, AggregateResponse)

mod aggregate;
mod history;
mod order;
mod summary;
mod type_info;
mod types;

pub use aggregate::{AggregateRequest, AggregateResponse};
pub use history::MarketHistoryPoint;
pub use order::MarketOrder;
pub use summary::ItemPriceSummary;
pub use type_info::TypeInfo;
pub use types::{OrderId, RegionId, TypeId};
