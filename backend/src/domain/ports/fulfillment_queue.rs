//! Port for the durable fulfillment stream with consumer groups.
//!
//! Delivery is at-least-once: a message read by a consumer stays pending
//! until acknowledged, and pending messages idle for too long can be
//! reclaimed by another consumer.
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::StreamFields;

use super::define_port_error;

define_port_error! {
    /// Errors surfaced by stream adapters.
    pub enum FulfillmentQueueError {
        /// Store is unreachable or a pooled connection could not be obtained.
        Connection { message: String } => "fulfillment stream connection failed: {message}",
        /// The stream command failed.
        Command { message: String } => "fulfillment stream command failed: {message}",
        /// The consumer group does not exist.
        NoGroup { group: String } => "consumer group {group} does not exist",
    }
}

/// One stream entry as delivered to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    /// Store-assigned entry id, e.g. `1700000000000-0`.
    pub id: String,
    /// Entry payload.
    pub fields: StreamFields,
}

/// Append-only stream with consumer groups and pending lists.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FulfillmentQueue: Send + Sync {
    /// Append an entry and return its id.
    async fn append(
        &self,
        stream: &str,
        fields: &StreamFields,
    ) -> Result<String, FulfillmentQueueError>;

    /// Create `group` on `stream` starting from the beginning, creating the
    /// stream if needed. Succeeds when the group already exists.
    async fn ensure_consumer_group(
        &self,
        stream: &str,
        group: &str,
    ) -> Result<(), FulfillmentQueueError>;

    /// Deliver up to `count` never-delivered entries to `consumer`, waiting at
    /// most `block` for one to arrive.
    async fn read_new(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
        block: Duration,
    ) -> Result<Vec<StreamMessage>, FulfillmentQueueError>;

    /// Acknowledge an entry. Acknowledging twice succeeds.
    async fn ack(&self, stream: &str, group: &str, id: &str) -> Result<(), FulfillmentQueueError>;

    /// Transfer up to `count` entries pending for longer than `min_idle` to
    /// `consumer` and return them.
    async fn reclaim_idle(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        min_idle: Duration,
        count: usize,
    ) -> Result<Vec<StreamMessage>, FulfillmentQueueError>;
}
