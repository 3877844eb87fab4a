//! # Order Intake Gate
//!
//! The only way an order enters the event stream. [`IntakeGate::admit`]
//! validates the request, checks every line item against the inventory, mints
//! an order id and publishes the order to the creation topic.
//!
//! A rejected request never writes to the bus.
//!
//! ## Admission Policies
//!
//! | Policy | Stock check | Oversell possible |
//! |--------|-------------|-------------------|
//! | [`AdmissionPolicy::Snapshot`] (default) | read a snapshot, compare | yes, two concurrent orders can both pass |
//! | [`AdmissionPolicy::Reserve`] | atomic reserve in the ledger | no |
//!
//! Under `Snapshot` the ledger is decremented later by the stock updater.
//! Under `Reserve` the gate has already taken the stock and stamps the order
//! with the quantities its reservation left; the stock updater only records
//! the deltas.

pub mod error;

pub use error::*;

use crate::clients::LedgerClient;
use crate::ledger::{Inventory, LedgerError};
use crate::model::{LineItem, Order, OrderId, OrderRequest};
use async_trait::async_trait;
use event_bus::ReliableProducer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Inventory as seen from the intake boundary.
#[async_trait]
pub trait StockSource: Send + Sync + 'static {
    async fn snapshot(&self) -> Result<Inventory, LedgerError>;
    /// Takes the stock atomically; returns the quantity left after each line.
    async fn reserve(&self, items: Vec<LineItem>) -> Result<Vec<i64>, LedgerError>;
    async fn release(&self, items: Vec<LineItem>) -> Result<(), LedgerError>;
}

#[async_trait]
impl StockSource for LedgerClient {
    async fn snapshot(&self) -> Result<Inventory, LedgerError> {
        LedgerClient::snapshot(self).await
    }

    async fn reserve(&self, items: Vec<LineItem>) -> Result<Vec<i64>, LedgerError> {
        LedgerClient::reserve(self, items).await
    }

    async fn release(&self, items: Vec<LineItem>) -> Result<(), LedgerError> {
        LedgerClient::release(self, items).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdmissionPolicy {
    #[default]
    Snapshot,
    Reserve,
}

impl Display for AdmissionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionPolicy::Snapshot => f.write_str("snapshot"),
            AdmissionPolicy::Reserve => f.write_str("reserve"),
        }
    }
}

impl FromStr for AdmissionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snapshot" => Ok(AdmissionPolicy::Snapshot),
            "reserve" => Ok(AdmissionPolicy::Reserve),
            other => Err(format!("unknown admission policy: {other}")),
        }
    }
}

/// Success body: `{"orderId": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admitted {
    pub order_id: OrderId,
}

/// Status code and JSON body for one intake call.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeResponse {
    pub status: u16,
    pub body: Value,
}

#[derive(Clone)]
pub struct IntakeGate {
    stock: Arc<dyn StockSource>,
    producer: ReliableProducer,
    topic: String,
    policy: AdmissionPolicy,
}

impl IntakeGate {
    pub fn new(
        stock: Arc<dyn StockSource>,
        producer: ReliableProducer,
        topic: impl Into<String>,
        policy: AdmissionPolicy,
    ) -> Self {
        Self {
            stock,
            producer,
            topic: topic.into(),
            policy,
        }
    }

    pub fn policy(&self) -> AdmissionPolicy {
        self.policy
    }

    #[instrument(skip(self, request), fields(user_id = %request.user_id, items = request.items.len()))]
    pub async fn admit(&self, request: OrderRequest) -> Result<OrderId, IntakeError> {
        validate_shape(&request.items)?;

        let order = match self.policy {
            AdmissionPolicy::Snapshot => {
                let stock = self.stock.snapshot().await?;
                check_stock(&stock, &request.items)?;
                Order::admit(request)
            }
            AdmissionPolicy::Reserve => {
                let left = self.stock.reserve(request.items.clone()).await?;
                Order::admit(request).with_reservation(left)
            }
        };

        let key = order.order_id.to_string();
        if let Err(e) = self.producer.send_json(&self.topic, &key, &order).await {
            error!(order_id = %order.order_id, error = %e, "Failed to publish order");
            if self.policy == AdmissionPolicy::Reserve {
                if let Err(release_err) = self.stock.release(order.items).await {
                    warn!(order_id = %key, error = %release_err, "Failed to release reservation");
                }
            }
            return Err(e.into());
        }

        info!(order_id = %order.order_id, "Order admitted");
        Ok(order.order_id)
    }

    /// Boundary entry point: decode a JSON body, admit it and render the reply.
    pub async fn handle_json(&self, body: &[u8]) -> IntakeResponse {
        let request: OrderRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(e) => {
                let err = IntakeError::from(ValidationError::Malformed(format!("invalid JSON: {e}")));
                return IntakeResponse {
                    status: err.status_code(),
                    body: err.error_body(),
                };
            }
        };

        match self.admit(request).await {
            Ok(order_id) => IntakeResponse {
                status: 201,
                body: serde_json::json!({ "orderId": order_id }),
            },
            Err(e) => IntakeResponse {
                status: e.status_code(),
                body: e.error_body(),
            },
        }
    }
}

fn validate_shape(items: &[LineItem]) -> Result<(), ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::Malformed(
            "order must contain at least one item".into(),
        ));
    }
    for item in items {
        if item.sku.as_str().trim().is_empty() {
            return Err(ValidationError::Malformed("item sku must not be empty".into()));
        }
        if item.qty < 1 {
            return Err(ValidationError::Malformed(format!(
                "invalid quantity {} for {}",
                item.qty, item.sku
            )));
        }
    }
    Ok(())
}

/// First violating line item wins.
fn check_stock(stock: &Inventory, items: &[LineItem]) -> Result<(), ValidationError> {
    for item in items {
        let available = *stock
            .get(&item.sku)
            .ok_or_else(|| ValidationError::UnknownSku(item.sku.clone()))?;
        let requested = u64::from(item.qty);
        if available < 0 || (available as u64) < requested {
            return Err(ValidationError::InsufficientStock {
                sku: item.sku.clone(),
                requested,
                available,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sku;

    fn stock(entries: &[(&str, i64)]) -> Inventory {
        entries
            .iter()
            .map(|(sku, qty)| (Sku::from(*sku), *qty))
            .collect()
    }

    #[test]
    fn test_shape_rejects_empty_and_zero_quantity() {
        assert!(matches!(validate_shape(&[]), Err(ValidationError::Malformed(_))));
        assert!(matches!(
            validate_shape(&[LineItem::new("S1", 0)]),
            Err(ValidationError::Malformed(_))
        ));
        assert!(matches!(
            validate_shape(&[LineItem::new(" ", 1)]),
            Err(ValidationError::Malformed(_))
        ));
        assert!(validate_shape(&[LineItem::new("S1", 1)]).is_ok());
    }

    #[test]
    fn test_check_stock_reports_first_violation() {
        let stock = stock(&[("S1", 50), ("S4", 15)]);

        let err = check_stock(
            &stock,
            &[LineItem::new("S4", 20), LineItem::new("MISSING", 1)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InsufficientStock {
                sku: Sku::from("S4"),
                requested: 20,
                available: 15
            }
        );

        let err = check_stock(&stock, &[LineItem::new("MISSING", 1)]).unwrap_err();
        assert_eq!(err, ValidationError::UnknownSku(Sku::from("MISSING")));

        assert!(check_stock(&stock, &[LineItem::new("S1", 50)]).is_ok());
    }

    #[test]
    fn test_negative_stock_never_admits() {
        let stock = stock(&[("S1", -3)]);
        assert!(check_stock(&stock, &[LineItem::new("S1", 1)]).is_err());
    }

    #[test]
    fn test_policy_parses_case_insensitively() {
        assert_eq!("Reserve".parse::<AdmissionPolicy>().unwrap(), AdmissionPolicy::Reserve);
        assert_eq!("snapshot".parse::<AdmissionPolicy>().unwrap(), AdmissionPolicy::Snapshot);
        assert!("optimistic".parse::<AdmissionPolicy>().is_err());
    }
}
