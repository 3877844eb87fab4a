//! # Order Flow
//!
//! Routes order-lifecycle events between independent services over an
//! [`event_bus`] and fans status updates out to live viewers.
//!
//! ## Core Components
//!
//! - **[intake]**: validates orders against the inventory and publishes them to the creation topic
//! - **[ledger]**: the inventory actor; serializes every decrement, seed and snapshot
//! - **[pipeline]**: the status pipeline (created ⇒ PAID) and the stock updater (ledger + inventory deltas)
//! - **[broker]**: per-order live subscriptions and the status fan-out
//! - **[lifecycle]**: [`OrderSystem`](lifecycle::OrderSystem) wires and stops everything
//! - **[model]**: the JSON payloads carried on each topic
//!
//! ## Flow
//!
//! ```text
//! IntakeGate ─► orders.created ─┬─► StatusPipeline ─► orders.status ─► StatusFanout ─► SubscriptionBroker ─► viewers
//!                               └─► StockUpdater ─► Ledger, inventory.updated
//! ```
//!
//! ## Testing
//!
//! See [`event_bus::mock`] for isolating the intake gate and pipelines from the bus.

pub mod broker;
pub mod clients;
pub mod config;
pub mod health;
pub mod intake;
pub mod ledger;
pub mod lifecycle;
pub mod model;
pub mod pipeline;
