//! # Clients
//!
//! Type-safe handles to the actors in this crate. Each client is cheap to
//! clone and hides the request/oneshot plumbing behind async methods.

pub mod ledger_client;

pub use ledger_client::LedgerClient;
