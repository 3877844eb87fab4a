use crate::ledger::LedgerError;
use crate::model::Sku;
use event_bus::DeliveryError;
use serde_json::{json, Value};

/// Why an order request was rejected before reaching the bus.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0}")]
    Malformed(String),
    #[error("product {0} does not exist")]
    UnknownSku(Sku),
    #[error("insufficient stock for {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        sku: Sku,
        requested: u64,
        available: i64,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to publish order: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("inventory unavailable: {0}")]
    Ledger(LedgerError),
}

impl From<LedgerError> for IntakeError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::UnknownSku(sku) => ValidationError::UnknownSku(sku).into(),
            LedgerError::InsufficientStock {
                sku,
                requested,
                available,
            } => ValidationError::InsufficientStock {
                sku,
                requested,
                available,
            }
            .into(),
            other => IntakeError::Ledger(other),
        }
    }
}

impl IntakeError {
    /// HTTP status an intake endpoint answers with.
    pub fn status_code(&self) -> u16 {
        match self {
            IntakeError::Validation(ValidationError::Malformed(_)) => 400,
            IntakeError::Validation(_) => 409,
            IntakeError::Delivery(_) | IntakeError::Ledger(_) => 500,
        }
    }

    pub fn error_body(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}
