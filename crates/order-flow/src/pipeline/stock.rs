use super::PipelineError;
use crate::clients::LedgerClient;
use crate::intake::AdmissionPolicy;
use crate::model::{InventoryDelta, Order};
use async_trait::async_trait;
use event_bus::{Record, RecordHandler, ReliableProducer};
use tracing::{debug, info, warn};

/// Applies each created order to the ledger and publishes one delta per line item.
///
/// Under [`AdmissionPolicy::Reserve`] the intake gate already took the stock,
/// so the updater reports the quantities stamped on the order by the
/// reservation instead of decrementing again.
#[derive(Clone)]
pub struct StockUpdater {
    ledger: LedgerClient,
    producer: ReliableProducer,
    inventory_topic: String,
    policy: AdmissionPolicy,
}

impl StockUpdater {
    pub fn new(
        ledger: LedgerClient,
        producer: ReliableProducer,
        inventory_topic: impl Into<String>,
        policy: AdmissionPolicy,
    ) -> Self {
        Self {
            ledger,
            producer,
            inventory_topic: inventory_topic.into(),
            policy,
        }
    }
}

impl StockUpdater {
    /// Quantities left by the order's reservation, one per line item.
    ///
    /// An order without them was admitted before the reserve policy was
    /// switched on; the current ledger value is the best available answer.
    async fn reserved_left(&self, order: &Order) -> Result<Vec<i64>, PipelineError> {
        if let Some(left) = &order.reserved_left {
            if left.len() == order.items.len() {
                return Ok(left.clone());
            }
        }
        warn!(order_id = %order.order_id, "Order carries no reservation; reporting current stock");
        let stock = self.ledger.snapshot().await?;
        Ok(order
            .items
            .iter()
            .map(|item| stock.get(&item.sku).copied().unwrap_or_default())
            .collect())
    }
}

#[async_trait]
impl RecordHandler for StockUpdater {
    type Error = PipelineError;

    fn name(&self) -> &'static str {
        "stock-updater"
    }

    async fn handle(&self, record: Record) -> Result<(), Self::Error> {
        let order: Order = record.json()?;
        let reserved = match self.policy {
            AdmissionPolicy::Snapshot => None,
            AdmissionPolicy::Reserve => Some(self.reserved_left(&order).await?),
        };

        for (index, item) in order.items.iter().enumerate() {
            let new_quantity = match &reserved {
                None => self.ledger.decrement(item.sku.clone(), item.qty).await?,
                Some(left) => left[index],
            };
            debug!(order_id = %order.order_id, sku = %item.sku, qty = item.qty, new_quantity, "Stock applied");

            let delta = InventoryDelta::new(
                item.sku.clone(),
                -i64::from(item.qty),
                new_quantity,
                order.order_id,
            );
            // The ledger change stands even if the audit record is lost.
            if let Err(e) = self
                .producer
                .send_json(&self.inventory_topic, item.sku.as_str(), &delta)
                .await
            {
                warn!(order_id = %order.order_id, sku = %item.sku, error = %e, "Inventory delta not published");
            }
        }

        info!(order_id = %order.order_id, items = order.items.len(), "Inventory updated");
        Ok(())
    }
}
