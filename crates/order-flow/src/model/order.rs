use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

/// Type-safe identifier for Orders.
///
/// Minted at intake and never supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Stock-keeping unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(pub String);

impl Sku {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Sku {
    fn from(sku: &str) -> Self {
        Self(sku.to_string())
    }
}

impl From<String> for Sku {
    fn from(sku: String) -> Self {
        Self(sku)
    }
}

impl Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: Sku,
    pub qty: u32,
}

impl LineItem {
    pub fn new(sku: impl Into<Sku>, qty: u32) -> Self {
        Self {
            sku: sku.into(),
            qty,
        }
    }
}

/// Payload accepted by the intake gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub user_id: String,
    pub items: Vec<LineItem>,
    pub total: f64,
    pub currency: String,
}

/// An admitted order, as written to the creation topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: String,
    pub items: Vec<LineItem>,
    pub total: f64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    /// Quantity left after each line item's reservation, in line order.
    /// Present only when intake reserved the stock itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_left: Option<Vec<i64>>,
}

impl Order {
    /// Stamps a request with a fresh id and the current time.
    pub fn admit(request: OrderRequest) -> Self {
        Self {
            order_id: OrderId::new(),
            user_id: request.user_id,
            items: request.items,
            total: request.total,
            currency: request.currency,
            created_at: Utc::now(),
            reserved_left: None,
        }
    }

    pub fn with_reservation(mut self, left: Vec<i64>) -> Self {
        self.reserved_left = Some(left);
        self
    }
}
