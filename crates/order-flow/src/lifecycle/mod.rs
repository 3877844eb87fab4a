//! # System Lifecycle & Orchestration
//!
//! Individual components are simple; wiring them together is where the
//! complexity lives. [`OrderSystem`] is the conductor.
//!
//! **Key Responsibilities:**
//! 1. **Actor Creation** - spawn the ledger actor and hand out its client
//! 2. **Seeding** - load the initial inventory before intake opens
//! 3. **Consumer Wiring** - start the status pipeline, stock updater and status fan-out, each under its own consumer group
//! 4. **Graceful Shutdown** - cancel, drain, and abort stragglers after a grace period
//!
//! ## Startup Order
//!
//! ```text
//! ledger actor ─► seed ─► consumer loops (join groups) ─► intake gate
//! ```
//!
//! Intake opens last. Consumers of a new group start at the end of the log,
//! so a consumer that joined after an order was admitted would never see it.
//!
//! ## Graceful Shutdown
//!
//! 1. **Cancel the shared token** - consumer loops leave their read, backoffs and processing delays wake up
//! 2. **Drop clients** - the ledger actor's receiver returns `None` once every client is gone
//! 3. **Await completion** - bounded by `SHUTDOWN_GRACE_MS` (default 5s)
//! 4. **Abort stragglers** - reported as [`SystemError::ShutdownTimedOut`]
//!
//! A record whose handler was interrupted is not redelivered to the same
//! process; the bus is at-least-once only across restarts of a real broker.
//!
//! ## Observability & Tracing
//!
//! Logging is set up once by the binary through
//! [`event_bus::tracing::setup_tracing`].

pub mod order_system;

pub use order_system::*;
