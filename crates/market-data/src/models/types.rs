/// Stable identifier of a tradeable item type (`type_id` upstream)
pub type TypeId = i32;

/// Market region identifier; orders and history are scoped to one region
pub type RegionId = i32;

/// Upstream order identifier
pub type OrderId = i64;
