//! # Domain Model
//!
//! Immutable value objects carried on the bus. Every type serializes to JSON
//! with camelCase field names.
//!
//! - [`Order`] / [`OrderRequest`] / [`LineItem`] - creation topic
//! - [`OrderStatusEvent`] - status topic
//! - [`InventoryDelta`] - inventory topic

pub mod inventory;
pub mod order;
pub mod status;

pub use inventory::*;
pub use order::*;
pub use status::*;
