//! # Order Flow Demo
//!
//! Runs the whole pipeline on the in-process bus:
//! 1.  Start the [`OrderSystem`] with configuration from the environment.
//! 2.  Subscribe a live viewer and admit an order.
//! 3.  Print the PAID frame the viewer receives.
//! 4.  Try an order that exceeds the stock and print the rejection.
//!
//! Ctrl-C at any point shuts the system down gracefully.

use event_bus::tracing::setup_tracing;
use event_bus::{EventBus, InMemoryBus};
use order_flow::config::Config;
use order_flow::lifecycle::OrderSystem;
use order_flow::model::{LineItem, OrderRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Instrument};

/// Extra wait for a status on top of the processing delay.
const STATUS_MARGIN: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup tracing once for the entire application
    setup_tracing();

    let config = Config::from_env()?;
    info!(?config, "Starting order flow");

    let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new(config.bus_partitions));
    let system = OrderSystem::start(config, bus).await?;

    tokio::select! {
        result = run_demo(&system) => {
            if let Err(e) = result {
                error!(error = %e, "Demo failed");
            }
        }
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    // Shutdown system gracefully
    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}

async fn run_demo(system: &OrderSystem) -> Result<(), Box<dyn std::error::Error>> {
    let order = OrderRequest {
        user_id: "user-1".to_string(),
        items: vec![LineItem::new("S1", 2)],
        total: 39.98,
        currency: "USD".to_string(),
    };

    let span = tracing::info_span!("order_processing");
    let order_id = async {
        info!("Admitting order");
        system.intake.admit(order).await
    }
    .instrument(span)
    .await?;

    // The id exists only after admission, so a short delay can beat the subscription.
    let mut viewer = system.broker.subscribe(order_id);
    let deadline = system.config().processing_delay + STATUS_MARGIN;
    match viewer.next_frame_within(deadline).await {
        Ok(Some(frame)) => print!("{frame}"),
        Ok(None) => error!(%order_id, "Stream closed before a status arrived"),
        Err(_) => warn!(%order_id, ?deadline, "No status arrived; it was likely published before the viewer subscribed"),
    }

    let oversized = OrderRequest {
        user_id: "user-2".to_string(),
        items: vec![LineItem::new("S4", 20)],
        total: 400.0,
        currency: "USD".to_string(),
    };
    match system.intake.admit(oversized).await {
        Ok(id) => info!(order_id = %id, "Oversized order unexpectedly admitted"),
        Err(e) => println!("rejected ({}): {}", e.status_code(), e.error_body()),
    }

    let stock = system.ledger.snapshot().await?;
    let mut skus: Vec<_> = stock.into_iter().collect();
    skus.sort();
    info!(?skus, "Final inventory");
    Ok(())
}
