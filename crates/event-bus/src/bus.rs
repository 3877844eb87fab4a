//! # EventBus Trait
//!
//! The `EventBus` trait is the contract every log implementation must satisfy:
//! the [`InMemoryBus`](crate::InMemoryBus) used by tests and the demo, the
//! [`MockBus`](crate::mock::MockBus) used to isolate producers, and any adapter
//! over a real broker.
//!
//! # Architecture Note
//! The bus writes a record or fails; it never
//! retries. Retry lives one layer up in the [`ReliableProducer`](crate::ReliableProducer),
//! and read-failure backoff lives in the [`ConsumerLoop`](crate::ConsumerLoop).
//!
//! # Delivery Guarantees
//! - Each consumer group keeps its own read position per topic partition.
//! - Members of one group share the partitions without overlap.
//! - Records sharing a key reach a group in write order.
//! - Nothing is promised across keys.

use crate::error::BusError;
use crate::record::Record;
use async_trait::async_trait;
use futures::stream::{self, BoxStream};

/// A durable, partitioned, append-only log addressed by topic name.
#[async_trait]
pub trait EventBus: Send + Sync + 'static {
    /// Append `payload` to `topic`, routed to a partition by `key`.
    async fn produce(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), BusError>;

    /// Join `group` on `topic` and return a reader positioned at the group's
    /// current offsets.
    ///
    /// Records produced after this call returns are guaranteed to be visible
    /// to the group.
    async fn consume(&self, topic: &str, group: &str) -> Result<Box<dyn Consumer>, BusError>;

    /// Whether the connection finished initializing. Drives the readiness probe.
    fn is_ready(&self) -> bool {
        true
    }
}

/// A member of a consumer group reading one topic.
#[async_trait]
pub trait Consumer: Send {
    /// Wait for the next record assigned to this member.
    ///
    /// Blocks while no record is available. A transient failure leaves the
    /// consumer usable; the caller may simply call again.
    async fn next_record(&mut self) -> Result<Record, BusError>;
}

/// A lazy, infinite, non-restartable sequence of records.
pub type RecordStream = BoxStream<'static, Result<Record, BusError>>;

/// Turn a consumer into a [`RecordStream`].
///
/// The stream never ends on its own; stop polling it to stop reading.
pub fn records(consumer: Box<dyn Consumer>) -> RecordStream {
    Box::pin(stream::unfold(consumer, |mut consumer| async move {
        let next = consumer.next_record().await;
        Some((next, consumer))
    }))
}
