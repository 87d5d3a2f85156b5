//! Sonyflake-style order identifier allocator.
//!
//! Layout, most significant bit first:
//!
//! ```text
//! | 1 bit unused | 39 bits elapsed ticks | 8 bits sequence | 16 bits machine |
//! ```
//!
//! A tick is 10 ms measured from a configurable epoch, which gives roughly 174
//! years of range. The sequence allows 256 identifiers per tick per machine;
//! a burst beyond that borrows the following tick.
//! Machine ids are assigned by deployment configuration and are not checked
//! for uniqueness at runtime.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use mockable::Clock;
use tracing::debug;

use crate::domain::ports::{IdAllocatorError, OrderIdAllocator};
use crate::domain::{OrderId, RetrySleeper, TokioSleeper};

const TIME_BITS: u32 = 39;
const SEQUENCE_BITS: u32 = 8;
const MACHINE_BITS: u32 = 16;
const TICK_MILLIS: i64 = 10;
const MAX_SEQUENCE: u16 = (1 << SEQUENCE_BITS) - 1;
const MAX_ELAPSED: i64 = (1 << TIME_BITS) - 1;

/// Allocator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdAllocatorConfig {
    /// Instant from which ticks are counted.
    pub epoch: DateTime<Utc>,
    /// Identity of this allocator instance; unique per running process.
    pub machine_id: u16,
}

impl IdAllocatorConfig {
    /// Default epoch, 2024-01-01T00:00:00Z.
    pub fn default_epoch() -> DateTime<Utc> {
        Utc.timestamp_opt(1_704_067_200, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl Default for IdAllocatorConfig {
    fn default() -> Self {
        Self {
            epoch: Self::default_epoch(),
            machine_id: 0,
        }
    }
}

/// Components of an allocated identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdParts {
    /// 10 ms ticks since the epoch.
    pub elapsed_ticks: u64,
    /// Position within the tick.
    pub sequence: u16,
    /// Issuing allocator instance.
    pub machine_id: u16,
}

/// Split an identifier into its layout fields.
///
/// # Examples
/// ```
/// use seckill::domain::{OrderId, decompose};
///
/// let parts = decompose(OrderId::new((5 << 24) | (2 << 16) | 9));
/// assert_eq!((parts.elapsed_ticks, parts.sequence, parts.machine_id), (5, 2, 9));
/// ```
pub fn decompose(id: OrderId) -> IdParts {
    let raw = id.get();
    IdParts {
        elapsed_ticks: raw >> (SEQUENCE_BITS + MACHINE_BITS),
        sequence: ((raw >> MACHINE_BITS) & u64::from(MAX_SEQUENCE)) as u16,
        machine_id: (raw & u64::from(u16::MAX)) as u16,
    }
}

#[derive(Debug, Default)]
struct TickState {
    elapsed: i64,
    sequence: u16,
}

/// Clock-driven identifier allocator.
///
/// When a tick's 256 sequence values are spent, allocation moves on to the
/// next tick and sleeps until the clock reaches it. Allocation fails with
/// [`IdAllocatorError::SequenceExhausted`] only when that would put the
/// issued tick more than [`MAX_LEAD_TICKS`] ahead of the clock.
pub struct SonyflakeAllocator {
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn RetrySleeper>,
    config: IdAllocatorConfig,
    state: Mutex<TickState>,
}

/// Furthest the issued tick may run ahead of the clock.
pub const MAX_LEAD_TICKS: i64 = 100;

impl SonyflakeAllocator {
    /// Allocator sleeping on the Tokio timer.
    pub fn new(clock: Arc<dyn Clock>, config: IdAllocatorConfig) -> Self {
        Self::with_sleeper(clock, Arc::new(TokioSleeper), config)
    }

    /// Allocator with an explicit sleeper, for deterministic tests.
    pub fn with_sleeper(
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn RetrySleeper>,
        config: IdAllocatorConfig,
    ) -> Self {
        Self {
            clock,
            sleeper,
            config,
            state: Mutex::new(TickState {
                elapsed: -1,
                sequence: 0,
            }),
        }
    }

    fn elapsed_millis(&self) -> Result<i64, IdAllocatorError> {
        let elapsed_ms = (self.clock.utc() - self.config.epoch).num_milliseconds();
        if elapsed_ms < 0 {
            return Err(IdAllocatorError::clock_before_epoch());
        }
        if elapsed_ms / TICK_MILLIS > MAX_ELAPSED {
            return Err(IdAllocatorError::clock_overflow());
        }
        Ok(elapsed_ms)
    }

    /// Reserve the next `(tick, sequence)` pair and report how long to wait
    /// before the clock catches up with a borrowed tick.
    fn reserve(&self, elapsed_ms: i64) -> Result<(OrderId, Duration), IdAllocatorError> {
        let current = elapsed_ms / TICK_MILLIS;
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        // A clock that steps backwards keeps issuing from the last tick.
        let mut wait = Duration::ZERO;
        if current > state.elapsed {
            state.elapsed = current;
            state.sequence = 0;
        } else if state.sequence < MAX_SEQUENCE {
            state.sequence += 1;
        } else {
            let borrowed = state.elapsed + 1;
            if borrowed > MAX_ELAPSED {
                return Err(IdAllocatorError::clock_overflow());
            }
            if borrowed - current > MAX_LEAD_TICKS {
                return Err(IdAllocatorError::sequence_exhausted());
            }
            state.elapsed = borrowed;
            state.sequence = 0;
            let ahead_ms = borrowed * TICK_MILLIS - elapsed_ms;
            wait = Duration::from_millis(u64::try_from(ahead_ms).unwrap_or(0));
        }

        let raw = ((state.elapsed as u64) << (SEQUENCE_BITS + MACHINE_BITS))
            | (u64::from(state.sequence) << MACHINE_BITS)
            | u64::from(self.config.machine_id);
        Ok((OrderId::new(raw), wait))
    }
}

#[async_trait]
impl OrderIdAllocator for SonyflakeAllocator {
    async fn next_id(&self) -> Result<OrderId, IdAllocatorError> {
        let (id, wait) = self.reserve(self.elapsed_millis()?)?;
        if !wait.is_zero() {
            debug!(
                wait_ms = wait.as_millis(),
                "sequence spent, waiting for the next tick"
            );
            self.sleeper.sleep(wait).await;
        }
        Ok(id)
    }
}
