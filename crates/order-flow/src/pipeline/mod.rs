//! # Pipelines
//!
//! Record handlers that consume the creation topic. Each runs under its own
//! consumer group, so both see every order.
//!
//! - [`StatusPipeline`] - simulates processing, then publishes a PAID status event
//! - [`StockUpdater`] - applies line items to the ledger and publishes inventory deltas
//!
//! A handler error is logged by the consumer loop and the record is skipped.

pub mod status;
pub mod stock;

pub use status::StatusPipeline;
pub use stock::StockUpdater;

use crate::ledger::LedgerError;
use event_bus::DeliveryError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Malformed order record: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Publish failed: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
