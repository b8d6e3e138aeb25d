use std::fmt;

use crate::models::{RegionId, TypeId};

/// Upstream endpoint family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// Live regional orders for one item
    Orders,
    /// Daily regional history for one item
    History,
    /// Static item description
    TypeInfo,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Orders => write!(f, "orders"),
            Self::History => write!(f, "history"),
            Self::TypeInfo => write!(f, "type-info"),
        }
    }
}

/// Describes one logical remote fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FetchRequest {
    pub kind: EndpointKind,
    pub region_id: Option<RegionId>,
    pub type_id: TypeId,
}

impl FetchRequest {
    pub fn orders(region_id: RegionId, type_id: TypeId) -> Self {
        Self {
            kind: EndpointKind::Orders,
            region_id: Some(region_id),
            type_id,
        }
    }

    pub fn history(region_id: RegionId, type_id: TypeId) -> Self {
        Self {
            kind: EndpointKind::History,
            region_id: Some(region_id),
            type_id,
        }
    }

    pub fn type_info(type_id: TypeId) -> Self {
        Self {
            kind: EndpointKind::TypeInfo,
            region_id: None,
            type_id,
        }
    }

    /// Path and query relative to the upstream base URL.
    pub fn path(&self) -> String {
        let region = self.region_id.unwrap_or_default();
        match self.kind {
            EndpointKind::Orders => {
                format!("/v1/markets/{}/orders/?type_id={}", region, self.type_id)
            }
            EndpointKind::History => {
                format!("/v1/markets/{}/history/?type_id={}", region, self.type_id)
            }
            EndpointKind::TypeInfo => format!("/v3/universe/types/{}/", self.type_id),
        }
    }
}
