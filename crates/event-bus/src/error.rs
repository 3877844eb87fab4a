//! # Bus Errors
//!
//! This module defines the error types shared by every bus implementation and
//! by the [`ReliableProducer`](crate::ReliableProducer). Keeping them in one
//! place lets consumers and producers match on the same failure taxonomy.

/// Errors raised by an [`EventBus`](crate::EventBus) implementation.
///
/// `Unavailable` is the transient case: the producer retries it and consumer
/// loops back off before reading again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    #[error("Bus unavailable: {0}")]
    Unavailable(String),
    #[error("Bus closed")]
    Closed,
    #[error("Operation cancelled")]
    Cancelled,
}

impl BusError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, BusError::Unavailable(_))
    }
}

/// Returned by [`ReliableProducer::send`](crate::ReliableProducer::send) when a
/// record could not be delivered.
///
/// There is no dead-letter path: the caller decides whether to fail its own
/// operation or log and drop the record.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Delivery failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: BusError },
    #[error("Delivery cancelled")]
    Cancelled,
    #[error("Payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}
