//! # Ledger Client
//!
//! Provides a high-level API for interacting with the [`LedgerActor`](crate::ledger::LedgerActor).
//! It wraps the request sender and turns channel failures into [`LedgerError`].
use crate::ledger::{Inventory, LedgerError, LedgerRequest};
use crate::model::{LineItem, Sku};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

/// Cloneable handle to the ledger actor.
#[derive(Clone)]
pub struct LedgerClient {
    sender: mpsc::Sender<LedgerRequest>,
}

impl LedgerClient {
    pub fn new(sender: mpsc::Sender<LedgerRequest>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> LedgerRequest,
    ) -> Result<T, LedgerError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| LedgerError::ActorClosed)?;
        response.await.map_err(|_| LedgerError::ActorDropped)
    }

    /// Subtract `qty` from `sku` and return the resulting quantity.
    #[instrument(skip(self))]
    pub async fn decrement(&self, sku: Sku, qty: u32) -> Result<i64, LedgerError> {
        debug!("Sending request");
        self.request(|respond_to| LedgerRequest::Decrement {
            sku,
            qty,
            respond_to,
        })
        .await?
    }

    /// Check and decrement every line item atomically.
    /// Returns the quantity left after each line, in line order.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn reserve(&self, items: Vec<LineItem>) -> Result<Vec<i64>, LedgerError> {
        debug!("Sending request");
        self.request(|respond_to| LedgerRequest::Reserve { items, respond_to })
            .await?
    }

    /// Give back quantities taken by [`reserve`](Self::reserve).
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn release(&self, items: Vec<LineItem>) -> Result<(), LedgerError> {
        debug!("Sending request");
        self.request(|respond_to| LedgerRequest::Release { items, respond_to })
            .await?
    }

    /// Overwrite the given keys; leave every other key untouched.
    #[instrument(skip(self, stock), fields(keys = stock.len()))]
    pub async fn seed(&self, stock: Inventory) -> Result<(), LedgerError> {
        debug!("Sending request");
        self.request(|respond_to| LedgerRequest::Seed { stock, respond_to })
            .await
    }

    pub async fn snapshot(&self) -> Result<Inventory, LedgerError> {
        self.request(|respond_to| LedgerRequest::Snapshot { respond_to })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_actor_is_reported() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        let client = LedgerClient::new(sender);

        assert_eq!(client.snapshot().await.unwrap_err(), LedgerError::ActorClosed);
    }

    #[tokio::test]
    async fn test_dropped_reply_is_reported() {
        let (sender, mut receiver) = mpsc::channel(1);
        let client = LedgerClient::new(sender);

        // Accept the request but drop the responder without answering.
        let server = tokio::spawn(async move {
            let _ = receiver.recv().await;
        });

        let err = client.decrement(Sku::from("S1"), 1).await.unwrap_err();
        assert_eq!(err, LedgerError::ActorDropped);
        server.await.unwrap();
    }
}
