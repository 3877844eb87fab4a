use crate::model::Sku;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger actor closed")]
    ActorClosed,
    #[error("Ledger actor dropped response channel")]
    ActorDropped,
    #[error("product {0} does not exist")]
    UnknownSku(Sku),
    #[error("insufficient stock for {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        sku: Sku,
        requested: u64,
        available: i64,
    },
    #[error("quantity for {0} out of range")]
    Overflow(Sku),
}
