use super::PipelineError;
use crate::model::{Order, OrderStatus, OrderStatusEvent};
use async_trait::async_trait;
use event_bus::{Record, RecordHandler, ReliableProducer};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Turns each created order into exactly one PAID status event after a fixed delay.
///
/// FAILED is never produced here.
#[derive(Clone)]
pub struct StatusPipeline {
    producer: ReliableProducer,
    status_topic: String,
    delay: Duration,
    cancel: CancellationToken,
}

impl StatusPipeline {
    pub fn new(
        producer: ReliableProducer,
        status_topic: impl Into<String>,
        delay: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            producer,
            status_topic: status_topic.into(),
            delay,
            cancel,
        }
    }
}

#[async_trait]
impl RecordHandler for StatusPipeline {
    type Error = PipelineError;

    fn name(&self) -> &'static str {
        "status-pipeline"
    }

    async fn handle(&self, record: Record) -> Result<(), Self::Error> {
        let order: Order = record.json()?;

        tokio::select! {
            _ = self.cancel.cancelled() => {
                debug!(order_id = %order.order_id, "Processing interrupted by shutdown");
                return Ok(());
            }
            _ = tokio::time::sleep(self.delay) => {}
        }

        let event = OrderStatusEvent::new(order.order_id, OrderStatus::Paid);
        self.producer
            .send_json(&self.status_topic, &order.order_id.to_string(), &event)
            .await?;

        info!(order_id = %order.order_id, status = %event.status, "Status published");
        Ok(())
    }
}
