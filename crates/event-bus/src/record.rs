//! # Records
//!
//! The unit of data carried by the bus. A record is immutable once produced:
//! consumers receive their own clone and the log keeps the original.

use std::fmt;

/// Position of a record inside one partition of a topic.
pub type Offset = u64;

/// A keyed, opaque payload read from a topic.
///
/// The `key` routes the record to a partition; records that share a key are
/// delivered to a consumer group in the order they were written.
#[derive(Clone, PartialEq, Eq)]
pub struct Record {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
    pub partition: u32,
    pub offset: Offset,
}

impl Record {
    /// Decode the payload as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

impl fmt::Debug for Record {
    // Payloads can be large; log their size instead of the bytes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("topic", &self.topic)
            .field("key", &self.key)
            .field("partition", &self.partition)
            .field("offset", &self.offset)
            .field("bytes", &self.payload.len())
            .finish()
    }
}
