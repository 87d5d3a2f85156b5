//! Order materializer: drains the fulfillment stream into the relational store.
//!
//! Each delivered message ends in exactly one state:
//!
//! - acknowledged, after the order row is written (or found already written);
//! - requeued, as a copy with `retry_count + 1` after a failed attempt;
//! - dead-lettered, when it cannot be decoded or its retries are spent;
//! - left pending, when even the requeue failed, for the recovery loop.
//!
//! Processing is idempotent, so redelivery after a crash is harmless.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::domain::ports::{
    FulfillmentQueue, FulfillmentQueueError, MaterializeOutcome, StreamMessage, VoucherRepository,
};
use crate::domain::{DeadLetterEntry, FulfillmentMessage};

mod config;
mod runtime;

pub use config::OrderMaterializerConfig;
pub use runtime::{AttemptJitter, OrderMaterializerPorts, OrderMaterializerRuntime, TokioSleeper};

/// Async sleeping abstraction for retry and polling delays.
#[async_trait]
pub trait RetrySleeper: Send + Sync {
    /// Suspend execution for `duration`.
    ///
    /// ```rust,no_run
    /// use async_trait::async_trait;
    /// use seckill::domain::RetrySleeper;
    /// use std::sync::{Arc, Mutex};
    /// use std::time::Duration;
    /// #[derive(Default)]
    /// struct CountingSleeper {
    ///     calls: Arc<Mutex<u32>>,
    /// }
    /// #[async_trait]
    /// impl RetrySleeper for CountingSleeper {
    ///     async fn sleep(&self, _duration: Duration) {
    ///         *self.calls.lock().expect("calls mutex") += 1;
    ///     }
    /// }
    /// ```
    async fn sleep(&self, duration: Duration);
}

/// Retry backoff jitter abstraction.
pub trait BackoffJitter: Send + Sync {
    /// Return a jittered delay from the exponential base delay.
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration;
}

/// Terminal state of one processed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDisposition {
    /// Order written and message acknowledged.
    Materialized,
    /// Order already existed; message acknowledged.
    Duplicate,
    /// A retry copy was appended and the original acknowledged.
    Requeued,
    /// Moved to the dead-letter stream and acknowledged.
    DeadLettered,
    /// Requeue failed; the original stays pending for reclaim.
    LeftPending,
}

/// One named consumer of the fulfillment stream.
pub struct OrderMaterializer {
    queue: Arc<dyn FulfillmentQueue>,
    vouchers: Arc<dyn VoucherRepository>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn RetrySleeper>,
    jitter: Arc<dyn BackoffJitter>,
    config: OrderMaterializerConfig,
    consumer: String,
}

impl OrderMaterializer {
    /// Build a materializer using default runtime dependencies.
    pub fn new(
        ports: OrderMaterializerPorts,
        clock: Arc<dyn Clock>,
        config: OrderMaterializerConfig,
        consumer: impl Into<String>,
    ) -> Self {
        Self::with_runtime(
            ports,
            clock,
            OrderMaterializerRuntime::default(),
            config,
            consumer,
        )
    }

    /// Build a materializer with injected runtime abstractions.
    pub fn with_runtime(
        ports: OrderMaterializerPorts,
        clock: Arc<dyn Clock>,
        runtime: OrderMaterializerRuntime,
        config: OrderMaterializerConfig,
        consumer: impl Into<String>,
    ) -> Self {
        Self {
            queue: ports.queue,
            vouchers: ports.vouchers,
            clock,
            sleeper: runtime.sleeper,
            jitter: runtime.jitter,
            config,
            consumer: consumer.into(),
        }
    }

    /// Consumer name used in the group.
    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    /// Create the consumer group if needed. Call once before the loops start.
    pub async fn prepare(&self) -> Result<(), FulfillmentQueueError> {
        self.queue
            .ensure_consumer_group(&self.config.stream, &self.config.group)
            .await
    }

    /// Consume new messages until `shutdown` flips to `true` or its sender
    /// is dropped. A message being processed is finished before returning.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(consumer = %self.consumer, "order materializer started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            let read = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                read = self.queue.read_new(
                    &self.config.stream,
                    &self.config.group,
                    &self.consumer,
                    self.config.batch_size,
                    self.config.poll_interval,
                ) => read,
            };
            match read {
                Ok(messages) => {
                    for message in messages {
                        self.process(message).await;
                    }
                }
                Err(error) => {
                    warn!(consumer = %self.consumer, %error, "fulfillment stream read failed");
                    if self.pause(&mut shutdown, self.config.error_backoff).await {
                        break;
                    }
                }
            }
        }
        info!(consumer = %self.consumer, "order materializer stopped");
    }

    /// Periodically reclaim messages left pending by stalled consumers.
    pub async fn run_reclaim(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if self
                .pause(&mut shutdown, self.config.reclaim_interval)
                .await
            {
                break;
            }
            self.reclaim_once().await;
        }
        debug!(consumer = %self.consumer, "reclaim loop stopped");
    }

    /// Run one recovery pass and return how many messages it processed.
    pub async fn reclaim_once(&self) -> usize {
        let reclaimed = match self
            .queue
            .reclaim_idle(
                &self.config.stream,
                &self.config.group,
                &self.consumer,
                self.config.reclaim_min_idle,
                self.config.reclaim_batch_size,
            )
            .await
        {
            Ok(messages) => messages,
            Err(error) => {
                warn!(consumer = %self.consumer, %error, "reclaiming idle messages failed");
                return 0;
            }
        };
        let count = reclaimed.len();
        if count > 0 {
            info!(consumer = %self.consumer, count, "reclaimed idle fulfillment messages");
        }
        for message in reclaimed {
            self.process(message).await;
        }
        count
    }

    /// Drive one delivered message to its terminal state.
    pub async fn process(&self, message: StreamMessage) -> MessageDisposition {
        let decoded = match FulfillmentMessage::from_fields(&message.fields) {
            Ok(decoded) => decoded,
            Err(error) => {
                let reason = format!("malformed fulfillment message: {error}");
                return self.dead_letter(&message, reason).await;
            }
        };

        if decoded.retry_count >= self.config.max_retries {
            let reason = format!(
                "retries exhausted after {} attempts for order {}",
                decoded.retry_count, decoded.order_id
            );
            return self.dead_letter(&message, reason).await;
        }

        match self
            .vouchers
            .reduce_stock_and_insert_order(&decoded.order())
            .await
        {
            Ok(outcome) => {
                self.ack(&message.id).await;
                match outcome {
                    MaterializeOutcome::Created => {
                        debug!(order_id = %decoded.order_id, "order materialized");
                        MessageDisposition::Materialized
                    }
                    MaterializeOutcome::AlreadyMaterialized => {
                        debug!(order_id = %decoded.order_id, "order already materialized");
                        MessageDisposition::Duplicate
                    }
                }
            }
            Err(error) => {
                warn!(
                    consumer = %self.consumer,
                    message_id = %message.id,
                    order_id = %decoded.order_id,
                    retry_count = decoded.retry_count,
                    %error,
                    "order materialization failed; scheduling retry"
                );
                self.requeue(&message, decoded).await
            }
        }
    }

    async fn requeue(
        &self,
        message: &StreamMessage,
        decoded: FulfillmentMessage,
    ) -> MessageDisposition {
        let attempt = decoded.retry_count.saturating_add(1);
        let delay =
            self.jitter
                .jittered_delay(self.retry_base_delay(attempt), attempt, self.clock.utc());
        self.sleeper.sleep(delay).await;

        let retry = decoded.next_attempt();
        match self
            .queue
            .append(&self.config.stream, &retry.to_fields())
            .await
        {
            Ok(_) => {
                self.ack(&message.id).await;
                MessageDisposition::Requeued
            }
            Err(error) => {
                error!(
                    message_id = %message.id,
                    order_id = %decoded.order_id,
                    %error,
                    "failed to requeue fulfillment message; leaving it pending"
                );
                MessageDisposition::LeftPending
            }
        }
    }

    async fn dead_letter(&self, message: &StreamMessage, reason: String) -> MessageDisposition {
        let entry = DeadLetterEntry {
            original_id: message.id.clone(),
            consumer: self.consumer.clone(),
            error: reason,
            failed_at: self.clock.utc(),
        };
        warn!(
            message_id = %message.id,
            consumer = %self.consumer,
            error = %entry.error,
            "dead-lettering fulfillment message"
        );
        let fields = entry.into_fields(&message.fields);
        if let Err(error) = self
            .queue
            .append(&self.config.dead_letter_stream, &fields)
            .await
        {
            // Acked regardless so a poison message cannot block the group.
            error!(message_id = %message.id, %error, "dead-letter append failed");
        }
        self.ack(&message.id).await;
        MessageDisposition::DeadLettered
    }

    async fn ack(&self, id: &str) {
        if let Err(error) = self
            .queue
            .ack(&self.config.stream, &self.config.group, id)
            .await
        {
            warn!(message_id = id, %error, "failed to acknowledge fulfillment message");
        }
    }

    /// Sleep for `duration` unless shutdown arrives first. Returns `true`
    /// when the caller should stop.
    async fn pause(&self, shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
        if *shutdown.borrow() {
            return true;
        }
        tokio::select! {
            changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
            () = self.sleeper.sleep(duration) => false,
        }
    }

    fn retry_base_delay(&self, attempt: u32) -> Duration {
        let exponent = 2_u32.saturating_pow(attempt.saturating_sub(1));
        let base_ms = u64::try_from(self.config.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.config.max_backoff.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(u64::from(exponent)).min(max_ms))
    }
}
