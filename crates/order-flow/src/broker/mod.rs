//! # Subscription Broker
//!
//! Fans status updates out to live viewers. Each viewer subscribes to one
//! order id and receives the raw status payloads published for that order.
//!
//! ## Delivery Rules
//!
//! - Every subscriber gets a bounded channel (default capacity 8).
//! - `broadcast` never blocks: a full channel misses the update but keeps its
//!   subscription; a closed channel is pruned from the registry.
//! - Payloads that do not carry a parseable `orderId` are ignored.
//! - Dropping a [`Subscription`] unsubscribes it.
//!
//! ## Locking
//!
//! The registry sits behind a `parking_lot::RwLock`. Broadcasts share the read
//! lock; subscribe, unsubscribe and pruning take the write lock.
//!
//! ```rust
//! use order_flow::broker::SubscriptionBroker;
//! use order_flow::model::OrderId;
//!
//! #[tokio::main]
//! async fn main() {
//!     let broker = SubscriptionBroker::new(8);
//!     let order_id = OrderId::new();
//!     let mut viewer = broker.subscribe(order_id);
//!
//!     let payload = format!(r#"{{"orderId":"{order_id}","status":"PAID"}}"#);
//!     broker.broadcast(payload.as_bytes());
//!
//!     let frame = viewer.next_frame().await.unwrap();
//!     assert!(frame.starts_with("data: "));
//! }
//! ```

pub mod fanout;

pub use fanout::StatusFanout;

use crate::model::OrderId;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::error::Elapsed;
use tracing::debug;

pub type SubscriptionId = u64;

/// Result of one [`SubscriptionBroker::broadcast`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub delivered: usize,
    /// Subscribers whose channel was full.
    pub dropped: usize,
}

struct Subscriber {
    id: SubscriptionId,
    sender: mpsc::Sender<Arc<str>>,
}

struct BrokerInner {
    registry: RwLock<HashMap<OrderId, Vec<Subscriber>>>,
    capacity: usize,
    next_id: AtomicU64,
}

impl BrokerInner {
    fn remove(&self, order_id: &OrderId, id: SubscriptionId) -> bool {
        let mut registry = self.registry.write();
        let Some(subscribers) = registry.get_mut(order_id) else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        let removed = subscribers.len() != before;
        if subscribers.is_empty() {
            registry.remove(order_id);
        }
        removed
    }

    fn prune_closed(&self, order_id: &OrderId) {
        let mut registry = self.registry.write();
        if let Some(subscribers) = registry.get_mut(order_id) {
            subscribers.retain(|s| !s.sender.is_closed());
            if subscribers.is_empty() {
                registry.remove(order_id);
            }
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "orderId")]
    order_id: OrderId,
}

/// Registry of live subscriptions, keyed by order id.
///
/// Cloning is cheap; clones share the registry.
#[derive(Clone)]
pub struct SubscriptionBroker {
    inner: Arc<BrokerInner>,
}

impl SubscriptionBroker {
    /// `capacity` is the per-subscriber buffer (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                registry: RwLock::new(HashMap::new()),
                capacity: capacity.max(1),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn subscribe(&self, order_id: OrderId) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.inner.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let size = {
            let mut registry = self.inner.registry.write();
            let subscribers = registry.entry(order_id).or_default();
            subscribers.push(Subscriber { id, sender });
            subscribers.len()
        };
        debug!(%order_id, subscription = id, size, "Subscribed");

        Subscription {
            order_id,
            id,
            receiver,
            broker: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a subscription and close its channel. Returns whether it was registered.
    pub fn unsubscribe(&self, order_id: OrderId, id: SubscriptionId) -> bool {
        let removed = self.inner.remove(&order_id, id);
        if removed {
            debug!(%order_id, subscription = id, "Unsubscribed");
        }
        removed
    }

    /// Send `payload` to every live subscriber of the order it names.
    pub fn broadcast(&self, payload: &[u8]) -> BroadcastOutcome {
        let order_id = match serde_json::from_slice::<Envelope>(payload) {
            Ok(envelope) => envelope.order_id,
            Err(e) => {
                debug!(error = %e, "Ignoring payload without orderId");
                return BroadcastOutcome::default();
            }
        };
        let text: Arc<str> = Arc::from(String::from_utf8_lossy(payload));

        let mut outcome = BroadcastOutcome::default();
        let mut closed = false;
        {
            let registry = self.inner.registry.read();
            let Some(subscribers) = registry.get(&order_id) else {
                return outcome;
            };
            for subscriber in subscribers {
                match subscriber.sender.try_send(text.clone()) {
                    Ok(()) => outcome.delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        outcome.dropped += 1;
                        debug!(%order_id, subscription = subscriber.id, "Subscriber full, update dropped");
                    }
                    Err(TrySendError::Closed(_)) => closed = true,
                }
            }
        }

        if closed {
            self.inner.prune_closed(&order_id);
        }
        outcome
    }

    pub fn subscriber_count(&self, order_id: OrderId) -> usize {
        self.inner
            .registry
            .read()
            .get(&order_id)
            .map_or(0, Vec::len)
    }
}

/// A live viewer of one order's status updates.
pub struct Subscription {
    order_id: OrderId,
    id: SubscriptionId,
    receiver: mpsc::Receiver<Arc<str>>,
    broker: Weak<BrokerInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// Next raw payload, or `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        self.receiver.recv().await
    }

    /// Next payload rendered as a server-sent-events frame.
    pub async fn next_frame(&mut self) -> Option<String> {
        self.recv().await.map(|payload| format!("data: {payload}\n\n"))
    }

    /// Like [`next_frame`](Self::next_frame), but gives up after `deadline`.
    /// A status published before this subscription existed is never replayed.
    pub async fn next_frame_within(&mut self, deadline: Duration) -> Result<Option<String>, Elapsed> {
        tokio::time::timeout(deadline, self.next_frame()).await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.broker.upgrade() {
            inner.remove(&self.order_id, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paid(order_id: OrderId) -> Vec<u8> {
        format!(r#"{{"orderId":"{order_id}","status":"PAID","updatedAt":"2025-01-01T00:00:00Z"}}"#)
            .into_bytes()
    }

    #[tokio::test]
    async fn test_subscriber_receives_broadcast() {
        let broker = SubscriptionBroker::new(8);
        let order_id = OrderId::new();
        let mut viewer = broker.subscribe(order_id);

        let outcome = broker.broadcast(&paid(order_id));
        assert_eq!(outcome, BroadcastOutcome { delivered: 1, dropped: 0 });

        let payload = viewer.recv().await.unwrap();
        assert!(payload.contains("PAID"));
    }

    #[tokio::test]
    async fn test_other_orders_are_not_delivered() {
        let broker = SubscriptionBroker::new(8);
        let mut viewer = broker.subscribe(OrderId::new());

        let outcome = broker.broadcast(&paid(OrderId::new()));
        assert_eq!(outcome.delivered, 0);
        assert!(viewer.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribed_viewer_never_receives() {
        let broker = SubscriptionBroker::new(8);
        let order_id = OrderId::new();
        let mut viewer = broker.subscribe(order_id);

        assert!(broker.unsubscribe(order_id, viewer.id()));
        broker.broadcast(&paid(order_id));

        assert!(viewer.recv().await.is_none());
        assert_eq!(broker.subscriber_count(order_id), 0);
    }

    #[tokio::test]
    async fn test_full_subscriber_misses_while_others_receive() {
        let broker = SubscriptionBroker::new(1);
        let order_id = OrderId::new();
        let mut slow = broker.subscribe(order_id);
        let mut fast = broker.subscribe(order_id);

        assert_eq!(broker.broadcast(&paid(order_id)).delivered, 2);
        fast.recv().await.unwrap();

        let outcome = broker.broadcast(&paid(order_id));
        assert_eq!(outcome, BroadcastOutcome { delivered: 1, dropped: 1 });
        assert_eq!(broker.subscriber_count(order_id), 2, "full subscriber is kept");

        fast.recv().await.unwrap();
        slow.recv().await.unwrap();
        assert!(slow.receiver.try_recv().is_err(), "second update was dropped");
    }

    #[tokio::test]
    async fn test_dropping_subscription_unregisters_it() {
        let broker = SubscriptionBroker::new(8);
        let order_id = OrderId::new();
        let viewer = broker.subscribe(order_id);
        let _other = broker.subscribe(order_id);
        assert_eq!(broker.subscriber_count(order_id), 2);

        drop(viewer);
        assert_eq!(broker.subscriber_count(order_id), 1);
    }

    #[test]
    fn test_closed_channel_is_pruned() {
        let broker = SubscriptionBroker::new(8);
        let order_id = OrderId::new();
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        broker
            .inner
            .registry
            .write()
            .entry(order_id)
            .or_default()
            .push(Subscriber { id: 99, sender });

        let outcome = broker.broadcast(&paid(order_id));
        assert_eq!(outcome.delivered, 0);
        assert_eq!(broker.subscriber_count(order_id), 0);
    }

    #[test]
    fn test_unparseable_payload_is_ignored() {
        let broker = SubscriptionBroker::new(8);
        assert_eq!(broker.broadcast(b"not json"), BroadcastOutcome::default());
        assert_eq!(broker.broadcast(br#"{"status":"PAID"}"#), BroadcastOutcome::default());
    }

    #[tokio::test]
    async fn test_frame_format() {
        let broker = SubscriptionBroker::new(8);
        let order_id = OrderId::new();
        let mut viewer = broker.subscribe(order_id);
        let payload = paid(order_id);

        broker.broadcast(&payload);
        let frame = viewer.next_frame().await.unwrap();
        assert_eq!(frame, format!("data: {}\n\n", String::from_utf8(payload).unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_sent_before_subscribing_times_out() {
        let broker = SubscriptionBroker::new(8);
        let order_id = OrderId::new();
        broker.broadcast(&paid(order_id));

        let mut viewer = broker.subscribe(order_id);
        assert!(viewer.next_frame_within(Duration::from_secs(2)).await.is_err());

        broker.broadcast(&paid(order_id));
        let frame = viewer.next_frame_within(Duration::from_secs(2)).await.unwrap();
        assert!(frame.unwrap().starts_with("data: "));
    }
}
