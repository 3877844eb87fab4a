//! # Event Bus
//!
//! Building blocks for services that talk through a durable, partitioned,
//! append-only log: the kind of broker where producers write keyed records to
//! topics and consumer groups read them back at their own pace.
//!
//! ## Architecture Overview
//!
//! The crate separates concerns into three layers:
//!
//! 1. **Contract** ([`EventBus`], [`Consumer`]) - write a record, join a group, read the next record
//! 2. **Implementations** ([`InMemoryBus`], [`mock::MockBus`]) - an in-process log and an expectation-driven mock
//! 3. **Reliability** ([`ReliableProducer`], [`ConsumerLoop`]) - bounded retry on write, backoff on read
//!
//! Application code writes its business logic in a [`RecordHandler`] and lets
//! a [`ConsumerLoop`] drive it; it writes through a [`ReliableProducer`] and
//! never sees a raw retry.
//!
//! ## Quick Start
//!
//! ```rust
//! use event_bus::{
//!     ConsumerLoop, EventBus, InMemoryBus, Record, RecordHandler, ReliableProducer, RetryPolicy,
//! };
//! use async_trait::async_trait;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Print;
//!
//! #[async_trait]
//! impl RecordHandler for Print {
//!     type Error = std::io::Error;
//!     fn name(&self) -> &'static str { "print" }
//!     async fn handle(&self, record: Record) -> Result<(), Self::Error> {
//!         println!("{} -> {} bytes", record.key, record.payload.len());
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new(3));
//!     let cancel = CancellationToken::new();
//!
//!     let worker = ConsumerLoop::new(bus.clone(), "greetings", "printer", Print, cancel.clone())
//!         .start()
//!         .await
//!         .unwrap();
//!
//!     let producer = ReliableProducer::new(bus, RetryPolicy::default(), cancel.clone());
//!     producer.send("greetings", "hello", b"world".to_vec()).await.unwrap();
//!
//!     cancel.cancel();
//!     worker.await.unwrap();
//! }
//! ```
//!
//! ## Testing
//!
//! See [`mock`] for the expectation-driven bus, and
//! [`InMemoryBus::fail_next_produces`] for injecting transient failures into
//! full pipelines.

pub mod bus;
pub mod consumer;
pub mod error;
pub mod memory;
pub mod mock;
pub mod producer;
pub mod record;
pub mod retry;
pub mod tracing;

// Re-export core types for convenience
pub use bus::{records, Consumer, EventBus, RecordStream};
pub use consumer::{ConsumerLoop, RecordHandler};
pub use error::{BusError, DeliveryError};
pub use memory::{InMemoryBus, StartOffset};
pub use producer::ReliableProducer;
pub use record::{Offset, Record};
pub use retry::{Backoff, RetryPolicy};
