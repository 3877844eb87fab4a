//! # Consumer Loop
//!
//! A [`ConsumerLoop`] owns one group membership and feeds every record it
//! reads to a [`RecordHandler`]. It is the long-running task behind each
//! background worker.
//!
//! ## Failure Handling
//!
//! | Failure              | Reaction                                      |
//! |----------------------|-----------------------------------------------|
//! | handler error        | logged, record skipped, loop continues        |
//! | transient read error | back off (50ms doubling, capped at 5s), retry |
//! | bus closed           | loop stops                                    |
//! | token cancelled      | loop stops, pending read is abandoned         |
//!
//! The backoff resets after every successful read.

use crate::bus::{self, EventBus};
use crate::error::BusError;
use crate::record::Record;
use crate::retry::Backoff;
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Processes the records of one consumer group.
///
/// Returning an error does not stop the loop; the record is logged and skipped.
#[async_trait]
pub trait RecordHandler: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    async fn handle(&self, record: Record) -> Result<(), Self::Error>;
}

pub struct ConsumerLoop<H: RecordHandler> {
    bus: Arc<dyn EventBus>,
    topic: String,
    group: String,
    handler: H,
    read_backoff: Backoff,
    cancel: CancellationToken,
}

impl<H: RecordHandler> ConsumerLoop<H> {
    pub fn new(
        bus: Arc<dyn EventBus>,
        topic: impl Into<String>,
        group: impl Into<String>,
        handler: H,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            bus,
            topic: topic.into(),
            group: group.into(),
            handler,
            read_backoff: Backoff::endless(Duration::from_millis(50), Duration::from_secs(5)),
            cancel,
        }
    }

    pub fn with_read_backoff(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.read_backoff = Backoff::endless(base_delay, max_delay);
        self
    }

    /// Join the consumer group, then spawn the read loop.
    ///
    /// Joining happens before this returns, so records produced afterwards
    /// are seen by the loop.
    pub async fn start(self) -> Result<JoinHandle<()>, BusError> {
        let consumer = self.bus.consume(&self.topic, &self.group).await?;
        info!(
            handler = self.handler.name(),
            topic = %self.topic,
            group = %self.group,
            "Consumer loop started"
        );
        Ok(tokio::spawn(self.run(bus::records(consumer))))
    }

    async fn run(mut self, mut records: bus::RecordStream) {
        let name = self.handler.name();

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                next = records.next() => next,
            };

            match next {
                Some(Ok(record)) => {
                    self.read_backoff.reset();
                    let (key, partition, offset) = (record.key.clone(), record.partition, record.offset);
                    debug!(handler = name, %key, partition, offset, "Handling record");
                    if let Err(e) = self.handler.handle(record).await {
                        warn!(handler = name, %key, partition, offset, error = %e, "Handler failed, skipping record");
                    }
                }
                Some(Err(BusError::Closed | BusError::Cancelled)) | None => break,
                Some(Err(e)) => {
                    let delay = self
                        .read_backoff
                        .next()
                        .unwrap_or(Duration::from_secs(5));
                    warn!(handler = name, error = %e, ?delay, "Read failed, backing off");
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        info!(handler = name, topic = %self.topic, group = %self.group, "Consumer loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBus;
    use parking_lot::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("rejected {0}")]
    struct Rejected(String);

    #[derive(Clone, Default)]
    struct Collect {
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl RecordHandler for Collect {
        type Error = Rejected;

        fn name(&self) -> &'static str {
            "collect"
        }

        async fn handle(&self, record: Record) -> Result<(), Self::Error> {
            let body = String::from_utf8_lossy(&record.payload).to_string();
            if body == "bad" {
                return Err(Rejected(body));
            }
            self.seen.lock().push(body);
            Ok(())
        }
    }

    async fn wait_for(seen: &Arc<Mutex<Vec<String>>>, count: usize) {
        for _ in 0..200 {
            if seen.lock().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for {count} records");
    }

    #[tokio::test]
    async fn test_handler_error_does_not_stop_loop() {
        let bus = InMemoryBus::new(1);
        let handler = Collect::default();
        let cancel = CancellationToken::new();

        let handle = ConsumerLoop::new(Arc::new(bus.clone()), "t", "g", handler.clone(), cancel.clone())
            .start()
            .await
            .unwrap();

        for body in ["one", "bad", "two"] {
            bus.produce("t", "k", body.as_bytes().to_vec()).await.unwrap();
        }

        wait_for(&handler.seen, 2).await;
        assert_eq!(*handler.seen.lock(), vec!["one".to_string(), "two".to_string()]);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_read_failures_back_off_and_recover() {
        let bus = InMemoryBus::new(1);
        let handler = Collect::default();
        let cancel = CancellationToken::new();

        bus.fail_next_reads(3);
        let handle = ConsumerLoop::new(Arc::new(bus.clone()), "t", "g", handler.clone(), cancel.clone())
            .with_read_backoff(Duration::from_millis(1), Duration::from_millis(5))
            .start()
            .await
            .unwrap();

        bus.produce("t", "k", b"after".to_vec()).await.unwrap();
        wait_for(&handler.seen, 1).await;

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_stops_idle_loop() {
        let bus = InMemoryBus::new(1);
        let cancel = CancellationToken::new();
        let handle = ConsumerLoop::new(Arc::new(bus), "t", "g", Collect::default(), cancel.clone())
            .start()
            .await
            .unwrap();

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should stop promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn test_closed_bus_stops_loop() {
        let bus = InMemoryBus::new(1);
        let handle = ConsumerLoop::new(
            Arc::new(bus.clone()),
            "t",
            "g",
            Collect::default(),
            CancellationToken::new(),
        )
        .start()
        .await
        .unwrap();

        bus.close();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should stop on close")
            .unwrap();
    }
}
