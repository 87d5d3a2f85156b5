//! Port for allocating globally unique order identifiers.
use async_trait::async_trait;

use crate::domain::OrderId;

use super::define_port_error;

define_port_error! {
    /// Errors raised while allocating an identifier.
    pub enum IdAllocatorError {
        /// The sequence would have to run too far ahead of the clock.
        SequenceExhausted => "identifier sequence exhausted for the current tick",
        /// The clock reads earlier than the configured epoch.
        ClockBeforeEpoch => "clock reads earlier than the identifier epoch",
        /// Elapsed time no longer fits the identifier layout.
        ClockOverflow => "elapsed time exceeds the identifier time range",
    }
}

impl IdAllocatorError {
    /// Whether the caller may succeed by trying again shortly.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SequenceExhausted)
    }
}

/// Source of order identifiers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderIdAllocator: Send + Sync {
    /// Allocate the next identifier. Identifiers increase strictly per
    /// allocator instance. When a tick's sequence is spent the allocator
    /// waits for the next tick rather than failing.
    async fn next_id(&self) -> Result<OrderId, IdAllocatorError>;
}
