use crate::model::{OrderId, Sku};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit record of one ledger change, written to the inventory topic keyed by SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDelta {
    pub sku: Sku,
    pub delta: i64,
    pub new_quantity: i64,
    pub order_id: OrderId,
    pub updated_at: DateTime<Utc>,
}

impl InventoryDelta {
    pub fn new(sku: Sku, delta: i64, new_quantity: i64, order_id: OrderId) -> Self {
        Self {
            sku,
            delta,
            new_quantity,
            order_id,
            updated_at: Utc::now(),
        }
    }
}
