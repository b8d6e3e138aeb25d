use serde::{Deserialize, Serialize};

use super::types::TypeId;

/// Static description of an item type from the universe endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub type_id: TypeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub group_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_group_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
    #[serde(default)]
    pub published: bool,
}
