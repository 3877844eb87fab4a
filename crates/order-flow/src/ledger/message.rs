//! # Ledger Messages
//!
//! Requests sent from a [`LedgerClient`](crate::clients::LedgerClient) to the
//! [`LedgerActor`](super::LedgerActor). Each carries a oneshot sender for the reply.

use super::LedgerError;
use crate::model::{LineItem, Sku};
use std::collections::HashMap;
use tokio::sync::oneshot;

/// SKU to available quantity. Signed: the ledger does not clamp at zero.
pub type Inventory = HashMap<Sku, i64>;

#[derive(Debug)]
pub enum LedgerRequest {
    Decrement {
        sku: Sku,
        qty: u32,
        respond_to: oneshot::Sender<Result<i64, LedgerError>>,
    },
    /// Replies with the quantity left after each line item, in line order.
    Reserve {
        items: Vec<LineItem>,
        respond_to: oneshot::Sender<Result<Vec<i64>, LedgerError>>,
    },
    Release {
        items: Vec<LineItem>,
        respond_to: oneshot::Sender<Result<(), LedgerError>>,
    },
    Seed {
        stock: Inventory,
        respond_to: oneshot::Sender<()>,
    },
    Snapshot {
        respond_to: oneshot::Sender<Inventory>,
    },
}
