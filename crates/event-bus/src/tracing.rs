//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing` subscriber filtered by the
//! `RUST_LOG` environment variable.
//!
//! ## What Gets Traced
//!
//! - **Bus**: produce (`debug`), consumer joins and leaves, close
//! - **Producer**: retries (`warn`), exhausted deliveries (`error`)
//! - **Consumer loops**: start and stop (`info`), handler failures and read backoff (`warn`)
//!
//! ```bash
//! # Lifecycle and failures only
//! RUST_LOG=info cargo run
//!
//! # Every record produced and handled
//! RUST_LOG=debug cargo run
//!
//! # Only the bus internals
//! RUST_LOG=event_bus=debug cargo run
//! ```
//!
//! With `RUST_LOG=debug` a single order looks like:
//!
//! ```text
//! DEBUG send: Produced topic="orders.created" key="6f0c..." partition=1 offset=0 bytes=143
//! DEBUG Handling record handler="status-pipeline" key=6f0c... partition=1 offset=0
//! DEBUG Handling record handler="stock-updater" key=6f0c... partition=1 offset=0
//! ```

/// Installs the global subscriber. Call once, at the start of `main`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
