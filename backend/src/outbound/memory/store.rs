//! In-process stand-in for the Redis side of the system.
//!
//! One mutex guards every key, counter, claim set, and stream, so the
//! admission step is atomic in the same way the Lua script is on Redis.
//! Blocking stream reads wait on a [`Notify`] that fires on every append.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::ports::{
    AdmissionGate, AdmissionGateError, AdmissionOutcome, AdmissionRequest, CacheKey, CacheStore,
    CacheStoreError, FulfillmentQueue, FulfillmentQueueError, StreamMessage,
};
use crate::domain::{FulfillmentMessage, ORDER_STREAM, StreamFields, UserId, VoucherId};

use super::stream::{EntryId, StreamLog};

#[derive(Debug)]
struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Default)]
struct StoreState {
    values: HashMap<String, Expiring<String>>,
    lists: HashMap<String, Expiring<Vec<String>>>,
    stock: HashMap<VoucherId, i64>,
    claims: HashMap<VoucherId, HashSet<UserId>>,
    streams: HashMap<String, StreamLog>,
}

/// In-memory implementation of [`CacheStore`], [`AdmissionGate`], and
/// [`FulfillmentQueue`].
#[derive(Debug)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    appended: Notify,
    order_stream: String,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Empty store appending admissions to the default order stream.
    pub fn new() -> Self {
        Self::with_order_stream(ORDER_STREAM)
    }

    /// Build a store whose admission step appends to `order_stream`.
    pub fn with_order_stream(order_stream: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            appended: Notify::new(),
            order_stream: order_stream.into(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current stock copy for a voucher.
    pub fn stock(&self, voucher_id: VoucherId) -> Option<i64> {
        self.lock().stock.get(&voucher_id).copied()
    }

    /// Number of buyers holding a claim on a voucher.
    pub fn claim_count(&self, voucher_id: VoucherId) -> usize {
        self.lock().claims.get(&voucher_id).map_or(0, HashSet::len)
    }

    /// Every entry ever appended to `stream`, oldest first.
    pub fn stream_entries(&self, stream: &str) -> Vec<StreamMessage> {
        self.lock()
            .streams
            .get(stream)
            .map(StreamLog::entries)
            .unwrap_or_default()
    }

    /// Number of entries appended to `stream`.
    pub fn stream_len(&self, stream: &str) -> usize {
        self.lock().streams.get(stream).map_or(0, StreamLog::len)
    }

    /// Number of delivered but unacknowledged entries for a group.
    pub fn pending_count(&self, stream: &str, group: &str) -> usize {
        self.lock()
            .streams
            .get(stream)
            .map_or(0, |log| log.pending_count(group))
    }

    /// Consumer currently owning a pending entry.
    pub fn pending_owner(&self, stream: &str, group: &str, id: &str) -> Option<String> {
        let id = id.parse::<EntryId>().ok()?;
        self.lock()
            .streams
            .get(stream)
            .and_then(|log| log.pending_owner(group, id).map(str::to_owned))
    }

    fn now_millis() -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
    }
}

fn parse_entry_id(id: &str) -> Result<EntryId, FulfillmentQueueError> {
    id.parse::<EntryId>()
        .map_err(FulfillmentQueueError::command)
}

#[async_trait]
impl CacheStore for InMemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheStoreError> {
        let now = Instant::now();
        let mut state = self.lock();
        match state.values.get(key.as_str()) {
            Some(entry) if entry.live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                state.values.remove(key.as_str());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), CacheStoreError> {
        let expires_at = Instant::now() + ttl;
        self.lock().values.insert(
            key.as_str().to_owned(),
            Expiring {
                value: value.to_owned(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheStoreError> {
        let mut state = self.lock();
        state.values.remove(key.as_str());
        state.lists.remove(key.as_str());
        Ok(())
    }

    async fn list_range(&self, key: &CacheKey) -> Result<Vec<String>, CacheStoreError> {
        let now = Instant::now();
        let state = self.lock();
        Ok(state
            .lists
            .get(key.as_str())
            .filter(|entry| entry.live(now))
            .map(|entry| entry.value.clone())
            .unwrap_or_default())
    }

    async fn replace_list(
        &self,
        key: &CacheKey,
        values: &[String],
        ttl: Duration,
    ) -> Result<(), CacheStoreError> {
        let expires_at = Instant::now() + ttl;
        self.lock().lists.insert(
            key.as_str().to_owned(),
            Expiring {
                value: values.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl AdmissionGate for InMemoryStore {
    async fn admit(
        &self,
        request: &AdmissionRequest,
    ) -> Result<AdmissionOutcome, AdmissionGateError> {
        let outcome = {
            let mut state = self.lock();
            let StoreState {
                stock,
                claims,
                streams,
                ..
            } = &mut *state;
            match stock.get_mut(&request.voucher_id) {
                None => AdmissionOutcome::NotStocked,
                Some(remaining) if *remaining <= 0 => AdmissionOutcome::OutOfStock,
                Some(remaining) => {
                    let claimed = claims.entry(request.voucher_id).or_default();
                    if claimed.contains(&request.user_id) {
                        AdmissionOutcome::AlreadyClaimed
                    } else {
                        *remaining -= 1;
                        claimed.insert(request.user_id);
                        let message = FulfillmentMessage::admitted(
                            request.order_id,
                            request.voucher_id,
                            request.user_id,
                        );
                        streams
                            .entry(self.order_stream.clone())
                            .or_default()
                            .append(Self::now_millis(), message.to_fields());
                        AdmissionOutcome::Admitted
                    }
                }
            }
        };
        if outcome == AdmissionOutcome::Admitted {
            self.appended.notify_waiters();
        }
        Ok(outcome)
    }

    async fn prime_stock(
        &self,
        voucher_id: VoucherId,
        stock: i32,
    ) -> Result<bool, AdmissionGateError> {
        let mut state = self.lock();
        if state.stock.contains_key(&voucher_id) {
            return Ok(false);
        }
        state.stock.insert(voucher_id, i64::from(stock));
        debug!(%voucher_id, stock, "primed in-memory stock");
        Ok(true)
    }
}

#[async_trait]
impl FulfillmentQueue for InMemoryStore {
    async fn append(
        &self,
        stream: &str,
        fields: &StreamFields,
    ) -> Result<String, FulfillmentQueueError> {
        let id = self
            .lock()
            .streams
            .entry(stream.to_owned())
            .or_default()
            .append(Self::now_millis(), fields.clone());
        self.appended.notify_waiters();
        Ok(id.to_string())
    }

    async fn ensure_consumer_group(
        &self,
        stream: &str,
        group: &str,
    ) -> Result<(), FulfillmentQueueError> {
        let created = self
            .lock()
            .streams
            .entry(stream.to_owned())
            .or_default()
            .create_group(group);
        if !created {
            debug!(stream, group, "consumer group already exists");
        }
        Ok(())
    }

    async fn read_new(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
        block: Duration,
    ) -> Result<Vec<StreamMessage>, FulfillmentQueueError> {
        let deadline = Instant::now() + block;
        loop {
            let notified = self.appended.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.lock();
                let log = state
                    .streams
                    .get_mut(stream)
                    .filter(|log| log.has_group(group))
                    .ok_or_else(|| FulfillmentQueueError::no_group(group))?;
                let delivered = log.deliver_new(group, consumer, count, Instant::now());
                if !delivered.is_empty() {
                    return Ok(delivered);
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn ack(&self, stream: &str, group: &str, id: &str) -> Result<(), FulfillmentQueueError> {
        let id = parse_entry_id(id)?;
        if let Some(log) = self.lock().streams.get_mut(stream) {
            log.ack(group, id);
        }
        Ok(())
    }

    async fn reclaim_idle(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        min_idle: Duration,
        count: usize,
    ) -> Result<Vec<StreamMessage>, FulfillmentQueueError> {
        let mut state = self.lock();
        let log = state
            .streams
            .get_mut(stream)
            .filter(|log| log.has_group(group))
            .ok_or_else(|| FulfillmentQueueError::no_group(group))?;
        Ok(log.claim_idle(group, consumer, min_idle, count, Instant::now()))
    }
}
