//! # Reliable Producer
//!
//! [`ReliableProducer`] wraps any [`EventBus`] with bounded exponential retry.
//! It is cheap to clone and can be shared across tasks; every clone observes
//! the same cancellation token.
//!
//! * **Bounded** - gives up after `max_attempts` writes and reports the last error.
//! * **Cancellable** - a cancelled token interrupts the backoff sleep immediately.
//! * **Selective** - only transient errors are retried; `Closed` fails at once.

use crate::bus::EventBus;
use crate::error::{BusError, DeliveryError};
use crate::retry::RetryPolicy;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

#[derive(Clone)]
pub struct ReliableProducer {
    bus: Arc<dyn EventBus>,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl ReliableProducer {
    pub fn new(bus: Arc<dyn EventBus>, policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            bus,
            policy,
            cancel,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Write one record, retrying transient failures with backoff.
    #[instrument(skip(self, payload), fields(bytes = payload.len()))]
    pub async fn send(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), DeliveryError> {
        let mut delays = self.policy.backoff();
        let mut attempts = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(DeliveryError::Cancelled);
            }

            attempts += 1;
            let last_error = match self.bus.produce(topic, key, payload.clone()).await {
                Ok(()) => {
                    if attempts > 1 {
                        info!(attempts, "Delivered after retry");
                    }
                    return Ok(());
                }
                Err(BusError::Cancelled) => return Err(DeliveryError::Cancelled),
                Err(e) if !e.is_transient() => {
                    error!(error = %e, "Delivery failed");
                    return Err(DeliveryError::Exhausted {
                        attempts,
                        last_error: e,
                    });
                }
                Err(e) => e,
            };

            let Some(delay) = delays.next() else {
                error!(attempts, error = %last_error, "Delivery retries exhausted");
                return Err(DeliveryError::Exhausted {
                    attempts,
                    last_error,
                });
            };

            warn!(attempts, ?delay, error = %last_error, "Produce failed, retrying");
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(DeliveryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Serialize `value` as JSON and [`send`](Self::send) it.
    pub async fn send_json<T>(&self, topic: &str, key: &str, value: &T) -> Result<(), DeliveryError>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_vec(value)?;
        self.send(topic, key, payload).await
    }
}
