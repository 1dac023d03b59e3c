//! Message values exchanged with the broker client seam.

use std::collections::HashMap;
use std::fmt;

/// Broker-assigned identifier for an acknowledged message.
///
/// Identifiers are totally ordered within a partition: offsets are
/// monotonically increasing, so later acknowledgements on the same partition
/// compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId {
    partition: u32,
    offset: u64,
}

impl MessageId {
    pub fn new(partition: u32, offset: u64) -> Self {
        Self { partition, offset }
    }

    /// Partition the message was written to.
    pub fn partition(&self) -> u32 {
        self.partition
    }

    /// Offset assigned within the partition.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.partition, self.offset)
    }
}

/// An outbound message: the payload plus per-message wire options.
///
/// Message customizers receive `&mut OutboundMessage<T>` right before
/// dispatch and mutate these fields directly.
#[derive(Debug, Clone)]
pub struct OutboundMessage<T> {
    /// The application payload.
    pub payload: T,

    /// Optional routing key.
    ///
    /// Brokers that partition by key use it to pick the partition; same key
    /// always maps to the same partition.
    pub key: Option<String>,

    /// Free-form string properties attached to the message.
    pub properties: HashMap<String, String>,

    /// Optional event time in epoch milliseconds.
    ///
    /// When unset, brokers typically stamp the message with publish time.
    pub event_time: Option<u64>,
}

impl<T> OutboundMessage<T> {
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            key: None,
            properties: HashMap::new(),
            event_time: None,
        }
    }
}

/// Callback mutating an outbound message before dispatch.
///
/// Applied after the message is built and before it reaches the sender;
/// typical uses set the routing key or attach properties.
pub type MessageCustomizerFn<T> = dyn Fn(&mut OutboundMessage<T>) + Send + Sync;
