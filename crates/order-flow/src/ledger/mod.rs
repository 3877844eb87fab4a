//! # Inventory Ledger
//!
//! The ledger owns the SKU to quantity map. It runs as a single actor task:
//! every operation is a message processed to completion before the next one
//! starts, so a decrement can never interleave with another decrement, a seed,
//! or a snapshot.
//!
//! ## Structure
//!
//! - [`LedgerActor`] - the server half; owns the map and the receiver
//! - [`LedgerClient`](crate::clients::LedgerClient) - the cloneable handle
//! - [`LedgerRequest`] - the message protocol
//! - [`LedgerError`] - reservation failures and channel errors
//!
//! ## Usage
//!
//! ```rust
//! use order_flow::ledger::LedgerActor;
//! use order_flow::model::Sku;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (actor, client) = LedgerActor::new(32);
//!     tokio::spawn(actor.run());
//!
//!     client.seed([(Sku::from("S1"), 50)].into_iter().collect()).await.unwrap();
//!     let left = client.decrement(Sku::from("S1"), 2).await.unwrap();
//!     assert_eq!(left, 48);
//! }
//! ```
//!
//! ## Semantics
//!
//! - **No floor**: `decrement` always applies; an unknown SKU starts at zero
//!   and goes negative.
//! - **Seed merges**: keys in the seed overwrite, other keys are untouched.
//! - **Reserve is all-or-nothing**: every line item is checked before any is applied.
//! - **No wrap-around**: a change that would leave the `i64` range is refused
//!   with [`LedgerError::Overflow`] and leaves the map untouched.

pub mod error;
pub mod message;

pub use error::*;
pub use message::*;

use crate::clients::LedgerClient;
use crate::model::{LineItem, Sku};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub struct LedgerActor {
    receiver: mpsc::Receiver<LedgerRequest>,
    stock: Inventory,
}

impl LedgerActor {
    /// Creates the actor and its client. `buffer_size` bounds the request queue.
    pub fn new(buffer_size: usize) -> (Self, LedgerClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            stock: HashMap::new(),
        };
        (actor, LedgerClient::new(sender))
    }

    /// Processes requests until every client has been dropped.
    pub async fn run(mut self) {
        info!("Ledger started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                LedgerRequest::Decrement {
                    sku,
                    qty,
                    respond_to,
                } => {
                    let result = self.decrement(&sku, qty);
                    match &result {
                        Ok(new_quantity) => debug!(%sku, qty, new_quantity, "Decrement"),
                        Err(e) => warn!(%sku, qty, error = %e, "Decrement refused"),
                    }
                    let _ = respond_to.send(result);
                }
                LedgerRequest::Reserve { items, respond_to } => {
                    let result = self.reserve(&items);
                    match &result {
                        Ok(_) => debug!(items = items.len(), "Reserved"),
                        Err(e) => debug!(error = %e, "Reservation rejected"),
                    }
                    let _ = respond_to.send(result);
                }
                LedgerRequest::Release { items, respond_to } => {
                    let result = self.release(&items);
                    match &result {
                        Ok(()) => debug!(items = items.len(), "Released"),
                        Err(e) => warn!(error = %e, "Release refused"),
                    }
                    let _ = respond_to.send(result);
                }
                LedgerRequest::Seed { stock, respond_to } => {
                    let keys = stock.len();
                    self.stock.extend(stock);
                    info!(keys, size = self.stock.len(), "Seeded");
                    let _ = respond_to.send(());
                }
                LedgerRequest::Snapshot { respond_to } => {
                    let _ = respond_to.send(self.stock.clone());
                }
            }
        }

        info!(size = self.stock.len(), "Ledger stopped");
    }

    fn decrement(&mut self, sku: &Sku, qty: u32) -> Result<i64, LedgerError> {
        let current = self.stock.get(sku).copied().unwrap_or(0);
        let new_quantity = current
            .checked_sub(i64::from(qty))
            .ok_or_else(|| LedgerError::Overflow(sku.clone()))?;
        self.stock.insert(sku.clone(), new_quantity);
        Ok(new_quantity)
    }

    fn release(&mut self, items: &[LineItem]) -> Result<(), LedgerError> {
        let mut updated: HashMap<Sku, i64> = HashMap::new();
        for item in items {
            let current = updated
                .get(&item.sku)
                .or_else(|| self.stock.get(&item.sku))
                .copied()
                .unwrap_or(0);
            let next = current
                .checked_add(i64::from(item.qty))
                .ok_or_else(|| LedgerError::Overflow(item.sku.clone()))?;
            updated.insert(item.sku.clone(), next);
        }
        self.stock.extend(updated);
        Ok(())
    }

    fn reserve(&mut self, items: &[LineItem]) -> Result<Vec<i64>, LedgerError> {
        // Sum per SKU so repeated lines are checked against their combined demand.
        let mut needed: HashMap<&Sku, u64> = HashMap::new();
        for item in items {
            let available = *self
                .stock
                .get(&item.sku)
                .ok_or_else(|| LedgerError::UnknownSku(item.sku.clone()))?;
            let requested = needed.entry(&item.sku).or_insert(0);
            *requested += u64::from(item.qty);
            if available < 0 || (available as u64) < *requested {
                return Err(LedgerError::InsufficientStock {
                    sku: item.sku.clone(),
                    requested: *requested,
                    available,
                });
            }
        }

        // Every line fits, so no subtraction below can leave the range.
        let mut left = Vec::with_capacity(items.len());
        for item in items {
            if let Some(quantity) = self.stock.get_mut(&item.sku) {
                *quantity -= i64::from(item.qty);
                left.push(*quantity);
            }
        }
        Ok(left)
    }
}
