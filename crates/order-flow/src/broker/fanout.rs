use super::SubscriptionBroker;
use async_trait::async_trait;
use event_bus::{Record, RecordHandler};
use std::convert::Infallible;
use tracing::debug;

/// Consumes the status topic and hands every payload to the broker.
#[derive(Clone)]
pub struct StatusFanout {
    broker: SubscriptionBroker,
}

impl StatusFanout {
    pub fn new(broker: SubscriptionBroker) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl RecordHandler for StatusFanout {
    type Error = Infallible;

    fn name(&self) -> &'static str {
        "status-fanout"
    }

    async fn handle(&self, record: Record) -> Result<(), Self::Error> {
        let outcome = self.broker.broadcast(&record.payload);
        debug!(key = %record.key, delivered = outcome.delivered, dropped = outcome.dropped, "Fanned out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrderId, OrderStatus, OrderStatusEvent};

    #[tokio::test]
    async fn test_fanout_delivers_status_record() {
        let broker = SubscriptionBroker::new(8);
        let order_id = OrderId::new();
        let mut viewer = broker.subscribe(order_id);

        let event = OrderStatusEvent::new(order_id, OrderStatus::Paid);
        let record = Record {
            topic: "orders.status".into(),
            key: order_id.to_string(),
            payload: serde_json::to_vec(&event).unwrap(),
            partition: 0,
            offset: 0,
        };
        StatusFanout::new(broker.clone()).handle(record).await.unwrap();

        let payload = viewer.recv().await.unwrap();
        let received: OrderStatusEvent = serde_json::from_str(&payload).unwrap();
        assert_eq!(received, event);
    }
}
