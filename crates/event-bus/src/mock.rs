//! # Mock Bus & Testing Guide
//!
//! [`MockBus`] implements [`EventBus`] with a queue of expectations instead of
//! a log. Use it to test code that *produces* records (intake, retry paths)
//! without caring about partitions or consumer groups.
//!
//! ## When to use MockBus vs InMemoryBus
//!
//! | Feature | MockBus | InMemoryBus |
//! |---------|---------|-------------|
//! | **Speed** | Instant | Instant |
//! | **Determinism** | Exact call sequence | Subject to scheduler |
//! | **Consumers** | Not supported | Full group semantics |
//! | **Error Injection** | Per call (`return_err`) | Next `n` calls (`fail_next_produces`) |
//! | **Use Case** | Unit tests around a producer | Pipelines and end-to-end flows |
//!
//! ## Example
//!
//! ```rust
//! use event_bus::mock::MockBus;
//! use event_bus::{BusError, EventBus};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockBus::new();
//!     mock.expect_produce("orders.created")
//!         .return_err(BusError::Unavailable("broker restarting".into()));
//!     mock.expect_produce("orders.created").return_ok();
//!
//!     assert!(mock.produce("orders.created", "k", vec![]).await.is_err());
//!     assert!(mock.produce("orders.created", "k", vec![]).await.is_ok());
//!
//!     mock.verify(); // Ensures all expectations were met
//!     assert_eq!(mock.produced().len(), 1);
//! }
//! ```

use crate::bus::{Consumer, EventBus};
use crate::error::BusError;
use crate::record::Record;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// An expected `produce` call and the response to give it.
struct Expectation {
    topic: String,
    response: Result<(), BusError>,
}

#[derive(Default)]
struct MockState {
    expectations: VecDeque<Expectation>,
    produced: Vec<Record>,
}

/// A bus that answers `produce` from a queue of expectations.
///
/// Clones share the same expectations and produced-record log.
#[derive(Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<MockState>>,
}

impl MockBus {
    /// Creates a mock with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects a `produce` call on `topic`.
    pub fn expect_produce(&self, topic: impl Into<String>) -> ProduceExpectationBuilder {
        ProduceExpectationBuilder {
            topic: topic.into(),
            state: self.state.clone(),
        }
    }

    /// Records accepted so far, in call order.
    pub fn produced(&self) -> Vec<Record> {
        self.state.lock().produced.clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let state = self.state.lock();
        if !state.expectations.is_empty() {
            panic!(
                "Not all expectations were met. {} remaining",
                state.expectations.len()
            );
        }
    }
}

/// Builder for `produce` expectations.
pub struct ProduceExpectationBuilder {
    topic: String,
    state: Arc<Mutex<MockState>>,
}

impl ProduceExpectationBuilder {
    /// Sets the expectation to accept the record.
    pub fn return_ok(self) {
        self.state.lock().expectations.push_back(Expectation {
            topic: self.topic,
            response: Ok(()),
        });
    }

    /// Sets the expectation to fail with `error`.
    pub fn return_err(self, error: BusError) {
        self.state.lock().expectations.push_back(Expectation {
            topic: self.topic,
            response: Err(error),
        });
    }
}

#[async_trait]
impl EventBus for MockBus {
    async fn produce(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), BusError> {
        let mut state = self.state.lock();
        let Some(expectation) = state.expectations.pop_front() else {
            panic!("Unexpected produce on topic {topic}");
        };
        if expectation.topic != topic {
            panic!(
                "Expectation mismatch: expected produce on {}, got {topic}",
                expectation.topic
            );
        }

        if expectation.response.is_ok() {
            let offset = state.produced.len() as u64;
            state.produced.push(Record {
                topic: topic.to_string(),
                key: key.to_string(),
                payload,
                partition: 0,
                offset,
            });
        }
        expectation.response
    }

    async fn consume(&self, _topic: &str, _group: &str) -> Result<Box<dyn Consumer>, BusError> {
        Err(BusError::Unavailable("MockBus does not support consumers".into()))
    }
}
