//! Materializer tuning knobs.

use std::time::Duration;

use crate::domain::{DEAD_LETTER_STREAM, ORDER_GROUP, ORDER_STREAM};

/// Stream names, retry budget, and loop timings for one materializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderMaterializerConfig {
    /// Stream carrying admitted orders.
    pub stream: String,
    /// Stream receiving messages that could not be materialized.
    pub dead_letter_stream: String,
    /// Consumer group shared by all materializers.
    pub group: String,
    /// Entries requested per read.
    pub batch_size: usize,
    /// Longest a read blocks when the stream is idle.
    pub poll_interval: Duration,
    /// Messages whose retry counter reaches this value are dead-lettered.
    pub max_retries: u32,
    /// First retry delay before jitter.
    pub initial_backoff: Duration,
    /// Retry delay cap before jitter.
    pub max_backoff: Duration,
    /// Pause after a failed read.
    pub error_backoff: Duration,
    /// Period of the idle-message recovery loop.
    pub reclaim_interval: Duration,
    /// Minimum pending age before a message may be reclaimed.
    pub reclaim_min_idle: Duration,
    /// Entries reclaimed per recovery pass.
    pub reclaim_batch_size: usize,
}

impl Default for OrderMaterializerConfig {
    fn default() -> Self {
        Self {
            stream: ORDER_STREAM.to_owned(),
            dead_letter_stream: DEAD_LETTER_STREAM.to_owned(),
            group: ORDER_GROUP.to_owned(),
            batch_size: 10,
            poll_interval: Duration::from_secs(2),
            max_retries: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
            error_backoff: Duration::from_secs(1),
            reclaim_interval: Duration::from_secs(2),
            reclaim_min_idle: Duration::from_secs(30),
            reclaim_batch_size: 10,
        }
    }
}
