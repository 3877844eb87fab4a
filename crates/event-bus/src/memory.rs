//! # In-Memory Partitioned Log
//!
//! [`InMemoryBus`] implements [`EventBus`] inside the process. It keeps the
//! semantics that matter to callers of a real broker:
//!
//! * **Partitions** - each topic has a fixed number of partitions and a record
//!   goes to `hash(key) % partitions`, so same-key records stay ordered.
//! * **Consumer groups** - each group tracks one offset per partition. Member
//!   `i` of `n` owns every partition `p` with `p % n == i`; joining or leaving
//!   rebalances on the next read.
//! * **Blocking reads** - a consumer with nothing to read parks until a
//!   producer appends to the log.
//!
//! The log lives behind a single `parking_lot::Mutex`. Reads are auto-commit:
//! handing a record to a member advances its group's offset.
//!
//! ```rust
//! use event_bus::{EventBus, InMemoryBus};
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus = InMemoryBus::new(3);
//!     let mut consumer = bus.consume("orders", "billing").await.unwrap();
//!
//!     bus.produce("orders", "order-1", b"{}".to_vec()).await.unwrap();
//!
//!     let record = consumer.next_record().await.unwrap();
//!     assert_eq!(record.key, "order-1");
//! }
//! ```

use crate::bus::{Consumer, EventBus};
use crate::error::BusError;
use crate::record::{Offset, Record};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info};

/// Where a consumer group starts reading when it is first created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartOffset {
    /// Only records produced after the group joined.
    #[default]
    Latest,
    /// Everything still in the log.
    Earliest,
}

type MemberId = u64;

struct StoredRecord {
    key: String,
    payload: Vec<u8>,
}

struct GroupState {
    offsets: Vec<Offset>,
    members: Vec<MemberId>,
}

struct TopicLog {
    partitions: Vec<Vec<StoredRecord>>,
    groups: HashMap<String, GroupState>,
}

impl TopicLog {
    fn new(partitions: u32) -> Self {
        Self {
            partitions: (0..partitions).map(|_| Vec::new()).collect(),
            groups: HashMap::new(),
        }
    }
}

#[derive(Default)]
struct LogState {
    topics: HashMap<String, TopicLog>,
    next_member: MemberId,
}

struct Inner {
    partitions: u32,
    start: StartOffset,
    state: Mutex<LogState>,
    appended: Notify,
    ready: AtomicBool,
    closed: AtomicBool,
    failing_produces: AtomicU32,
    failing_reads: AtomicU32,
}

/// An in-process implementation of the bus contract.
///
/// Cloning is cheap; every clone shares the same log.
#[derive(Clone)]
pub struct InMemoryBus {
    inner: Arc<Inner>,
}

impl InMemoryBus {
    /// Creates a bus whose topics have `partitions` partitions (at least one).
    pub fn new(partitions: u32) -> Self {
        Self::with_start_offset(partitions, StartOffset::default())
    }

    pub fn with_start_offset(partitions: u32, start: StartOffset) -> Self {
        let partitions = partitions.max(1);
        info!(partitions, ?start, "In-memory bus started");
        Self {
            inner: Arc::new(Inner {
                partitions,
                start,
                state: Mutex::new(LogState::default()),
                appended: Notify::new(),
                ready: AtomicBool::new(true),
                closed: AtomicBool::new(false),
                failing_produces: AtomicU32::new(0),
                failing_reads: AtomicU32::new(0),
            }),
        }
    }

    pub fn partitions(&self) -> u32 {
        self.inner.partitions
    }

    /// Partition a key is routed to.
    pub fn partition_for(&self, key: &str) -> u32 {
        (fnv1a(key.as_bytes()) % u64::from(self.inner.partitions)) as u32
    }

    /// Every record currently stored for `topic`, partition by partition.
    pub fn log_snapshot(&self, topic: &str) -> Vec<Record> {
        let state = self.inner.state.lock();
        let Some(log) = state.topics.get(topic) else {
            return Vec::new();
        };
        log.partitions
            .iter()
            .enumerate()
            .flat_map(|(partition, records)| {
                records.iter().enumerate().map(move |(offset, stored)| Record {
                    topic: topic.to_string(),
                    key: stored.key.clone(),
                    payload: stored.payload.clone(),
                    partition: partition as u32,
                    offset: offset as Offset,
                })
            })
            .collect()
    }

    /// Make the next `count` produce calls fail with a transient error.
    pub fn fail_next_produces(&self, count: u32) {
        self.inner.failing_produces.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` reads fail with a transient error.
    pub fn fail_next_reads(&self, count: u32) {
        self.inner.failing_reads.store(count, Ordering::SeqCst);
    }

    pub fn set_ready(&self, ready: bool) {
        self.inner.ready.store(ready, Ordering::SeqCst);
    }

    /// Reject further produces and wake every blocked consumer with [`BusError::Closed`].
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.appended.notify_waiters();
        info!("In-memory bus closed");
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

/// Decrement an injected-failure counter; true if a failure was consumed.
fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

// FNV-1a keeps partition routing stable across runs and toolchains.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn produce(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), BusError> {
        if self.is_closed() {
            return Err(BusError::Closed);
        }
        if take_failure(&self.inner.failing_produces) {
            return Err(BusError::Unavailable("injected produce failure".into()));
        }

        let partition = self.partition_for(key);
        let offset = {
            let mut state = self.inner.state.lock();
            let log = state
                .topics
                .entry(topic.to_string())
                .or_insert_with(|| TopicLog::new(self.inner.partitions));
            let records = &mut log.partitions[partition as usize];
            records.push(StoredRecord {
                key: key.to_string(),
                payload,
            });
            (records.len() - 1) as Offset
        };

        debug!(topic, key, partition, offset, "Produced");
        self.inner.appended.notify_waiters();
        Ok(())
    }

    async fn consume(&self, topic: &str, group: &str) -> Result<Box<dyn Consumer>, BusError> {
        if self.is_closed() {
            return Err(BusError::Closed);
        }

        let member = {
            let mut state = self.inner.state.lock();
            let member = state.next_member;
            state.next_member += 1;

            let partitions = self.inner.partitions;
            let start = self.inner.start;
            let log = state
                .topics
                .entry(topic.to_string())
                .or_insert_with(|| TopicLog::new(partitions));
            let ends: Vec<Offset> = log
                .partitions
                .iter()
                .map(|records| records.len() as Offset)
                .collect();
            let group_state = log
                .groups
                .entry(group.to_string())
                .or_insert_with(|| GroupState {
                    offsets: match start {
                        StartOffset::Latest => ends,
                        StartOffset::Earliest => vec![0; partitions as usize],
                    },
                    members: Vec::new(),
                });
            group_state.members.push(member);
            member
        };

        info!(topic, group, member, "Consumer joined group");
        Ok(Box::new(InMemoryConsumer {
            bus: self.clone(),
            topic: topic.to_string(),
            group: group.to_string(),
            member,
            cursor: 0,
        }))
    }

    fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst) && !self.is_closed()
    }
}

/// One member of a consumer group on an [`InMemoryBus`].
///
/// Dropping it leaves the group; its partitions move to the remaining members.
pub struct InMemoryConsumer {
    bus: InMemoryBus,
    topic: String,
    group: String,
    member: MemberId,
    cursor: u32,
}

impl InMemoryConsumer {
    /// Take the next unread record from a partition owned by this member.
    fn try_take(&mut self) -> Option<Record> {
        let mut state = self.bus.inner.state.lock();
        let log = state.topics.get_mut(&self.topic)?;
        let TopicLog { partitions, groups } = log;
        let group = groups.get_mut(&self.group)?;

        let index = group.members.iter().position(|m| *m == self.member)?;
        let members = group.members.len() as u32;
        let total = self.bus.inner.partitions;

        // Rotate the starting partition so one busy key cannot starve the others.
        for step in 0..total {
            let partition = (self.cursor + step) % total;
            if partition % members != index as u32 {
                continue;
            }
            let offset = group.offsets[partition as usize];
            if let Some(stored) = partitions[partition as usize].get(offset as usize) {
                group.offsets[partition as usize] += 1;
                self.cursor = (partition + 1) % total;
                return Some(Record {
                    topic: self.topic.clone(),
                    key: stored.key.clone(),
                    payload: stored.payload.clone(),
                    partition,
                    offset,
                });
            }
        }
        None
    }
}

#[async_trait]
impl Consumer for InMemoryConsumer {
    async fn next_record(&mut self) -> Result<Record, BusError> {
        if take_failure(&self.bus.inner.failing_reads) {
            return Err(BusError::Unavailable("injected read failure".into()));
        }

        let inner = Arc::clone(&self.bus.inner);
        loop {
            // Register interest before checking the log so an append between
            // the check and the await still wakes us.
            let appended = inner.appended.notified();
            tokio::pin!(appended);
            appended.as_mut().enable();

            if inner.closed.load(Ordering::SeqCst) {
                return Err(BusError::Closed);
            }
            if let Some(record) = self.try_take() {
                return Ok(record);
            }
            appended.await;
        }
    }
}

impl Drop for InMemoryConsumer {
    fn drop(&mut self) {
        let mut state = self.bus.inner.state.lock();
        if let Some(group) = state
            .topics
            .get_mut(&self.topic)
            .and_then(|log| log.groups.get_mut(&self.group))
        {
            group.members.retain(|m| *m != self.member);
        }
        debug!(topic = %self.topic, group = %self.group, member = self.member, "Consumer left group");
    }
}
