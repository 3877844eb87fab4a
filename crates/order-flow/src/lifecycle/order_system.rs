use crate::broker::{StatusFanout, SubscriptionBroker};
use crate::clients::LedgerClient;
use crate::config::Config;
use crate::health::Health;
use crate::intake::IntakeGate;
use crate::ledger::{LedgerActor, LedgerError};
use crate::pipeline::{StatusPipeline, StockUpdater};
use event_bus::{BusError, ConsumerLoop, EventBus, ReliableProducer};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("Failed to seed inventory: {0}")]
    Seed(#[from] LedgerError),
    #[error("Failed to start consumer: {0}")]
    Consumer(#[from] BusError),
    #[error("Task failed: {0}")]
    Task(#[from] JoinError),
    #[error("Shutdown exceeded {grace:?}; aborted {aborted} tasks")]
    ShutdownTimedOut { grace: Duration, aborted: usize },
}

/// The runtime orchestrator for the order pipeline.
///
/// `OrderSystem` is responsible for:
/// - **Lifecycle Management**: starting the ledger actor and the three consumer loops, and stopping them
/// - **Dependency Wiring**: handing the ledger client, producer and broker to the components that need them
/// - **Seeding**: loading the initial inventory before any order is admitted
///
/// # Example
///
/// ```ignore
/// let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new(3));
/// let system = OrderSystem::start(Config::default(), bus).await?;
///
/// let mut viewer = system.broker.subscribe(order_id);
/// let order_id = system.intake.admit(request).await?;
///
/// system.shutdown().await?;
/// ```
pub struct OrderSystem {
    /// Entry point for new orders
    pub intake: IntakeGate,

    /// Client for the inventory ledger actor
    pub ledger: LedgerClient,

    /// Registry of live status viewers
    pub broker: SubscriptionBroker,

    pub health: Health,

    config: Config,
    cancel: CancellationToken,

    /// Task handles for the ledger and every consumer loop (used for graceful shutdown)
    handles: Vec<JoinHandle<()>>,
}

impl OrderSystem {
    /// Seeds the ledger and starts every background task.
    ///
    /// Consumer groups are joined before this returns, so orders admitted
    /// afterwards are seen by every pipeline.
    pub async fn start(config: Config, bus: Arc<dyn EventBus>) -> Result<Self, SystemError> {
        let cancel = CancellationToken::new();
        let mut handles = Vec::new();

        // 1. Ledger first: intake and the stock updater both depend on it
        let (ledger_actor, ledger) = LedgerActor::new(32);
        handles.push(tokio::spawn(ledger_actor.run()));
        ledger.seed(config.initial_inventory.clone()).await?;

        let producer = ReliableProducer::new(bus.clone(), config.retry.clone(), cancel.clone());
        let broker = SubscriptionBroker::new(config.subscriber_buffer);

        // 2. Consumer loops, each under its own group
        let status = StatusPipeline::new(
            producer.clone(),
            &config.status_topic,
            config.processing_delay,
            cancel.clone(),
        );
        handles.push(
            ConsumerLoop::new(
                bus.clone(),
                &config.orders_topic,
                &config.processor_group,
                status,
                cancel.clone(),
            )
            .start()
            .await?,
        );

        let stock = StockUpdater::new(
            ledger.clone(),
            producer.clone(),
            &config.inventory_topic,
            config.admission_policy,
        );
        handles.push(
            ConsumerLoop::new(
                bus.clone(),
                &config.orders_topic,
                &config.stock_group,
                stock,
                cancel.clone(),
            )
            .start()
            .await?,
        );

        handles.push(
            ConsumerLoop::new(
                bus.clone(),
                &config.status_topic,
                &config.notifications_group,
                StatusFanout::new(broker.clone()),
                cancel.clone(),
            )
            .start()
            .await?,
        );

        // 3. Intake last, once every consumer is listening
        let intake = IntakeGate::new(
            Arc::new(ledger.clone()),
            producer,
            &config.orders_topic,
            config.admission_policy,
        );

        info!(
            policy = %config.admission_policy,
            tasks = handles.len(),
            "Order system started"
        );

        Ok(Self {
            intake,
            ledger,
            broker,
            health: Health::new(bus),
            config,
            cancel,
            handles,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token observed by every consumer loop and producer backoff.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Gracefully shuts down the entire system.
    ///
    /// 1. Cancels the shared token; consumer loops and pending backoffs stop
    /// 2. Drops this system's clients so the ledger actor's channel closes
    /// 3. Waits up to the configured grace period, then aborts whatever is left
    ///
    /// The ledger only stops once every clone of its client is gone, including
    /// clones of [`IntakeGate`] held elsewhere.
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down system...");

        let Self {
            intake,
            ledger,
            broker,
            health,
            config,
            cancel,
            mut handles,
        } = self;

        cancel.cancel();
        drop(intake);
        drop(ledger);
        drop(broker);
        drop(health);

        let grace = config.shutdown_grace;
        let drained = tokio::time::timeout(grace, async {
            for handle in handles.iter_mut() {
                handle.await?;
            }
            Ok::<(), JoinError>(())
        })
        .await;

        match drained {
            Ok(Ok(())) => {
                info!("System shutdown complete.");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(error = %e, "Task failed during shutdown");
                handles.iter().for_each(JoinHandle::abort);
                Err(e.into())
            }
            Err(_) => {
                let aborted = handles.iter().filter(|h| !h.is_finished()).count();
                handles.iter().for_each(JoinHandle::abort);
                warn!(?grace, aborted, "Shutdown grace period elapsed");
                Err(SystemError::ShutdownTimedOut { grace, aborted })
            }
        }
    }
}
