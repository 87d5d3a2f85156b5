//! Port and runtime dependency bundles for the order materializer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{FulfillmentQueue, VoucherRepository};

use super::{BackoffJitter, RetrySleeper};

/// Port bundle required by the materializer.
#[derive(Clone)]
pub struct OrderMaterializerPorts {
    /// Fulfillment stream adapter.
    pub queue: Arc<dyn FulfillmentQueue>,
    /// Relational voucher store.
    pub vouchers: Arc<dyn VoucherRepository>,
}

impl OrderMaterializerPorts {
    /// Bundle the stream and relational adapters.
    pub fn new(queue: Arc<dyn FulfillmentQueue>, vouchers: Arc<dyn VoucherRepository>) -> Self {
        Self { queue, vouchers }
    }
}

/// Runtime helpers used by the retry and polling paths.
#[derive(Clone)]
pub struct OrderMaterializerRuntime {
    /// Async sleep implementation.
    pub sleeper: Arc<dyn RetrySleeper>,
    /// Jitter strategy for retry delays.
    pub jitter: Arc<dyn BackoffJitter>,
}

impl Default for OrderMaterializerRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(AttemptJitter),
        }
    }
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl RetrySleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Default jitter: adds up to a quarter of the base delay, seeded from the
/// clock so concurrent consumers spread out.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptJitter;

impl BackoffJitter for AttemptJitter {
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration {
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let max_extra = (base_ms / 4).max(1);
        let seed = u64::from(now.timestamp_subsec_nanos()) ^ u64::from(attempt);
        let extra = seed % (max_extra.saturating_add(1));
        Duration::from_millis(base_ms.saturating_add(extra))
    }
}
