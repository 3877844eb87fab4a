use crate::model::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Processing,
    Paid,
    Failed,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// One step in an order's lifecycle, as written to the status topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusEvent {
    pub order_id: OrderId,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl OrderStatusEvent {
    pub fn new(order_id: OrderId, status: OrderStatus) -> Self {
        Self {
            order_id,
            status,
            reason: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_omitted_when_absent() {
        let event = OrderStatusEvent::new(OrderId::new(), OrderStatus::Paid);
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["status"], "PAID");
        assert!(value.get("reason").is_none());
        assert!(value["updatedAt"].is_string());
    }

    #[test]
    fn test_failed_event_carries_reason() {
        let event = OrderStatusEvent::new(OrderId::new(), OrderStatus::Failed).with_reason("card declined");
        let json = serde_json::to_string(&event).unwrap();
        let back: OrderStatusEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(back.status, OrderStatus::Failed);
        assert_eq!(back.reason.as_deref(), Some("card declined"));
    }
}
