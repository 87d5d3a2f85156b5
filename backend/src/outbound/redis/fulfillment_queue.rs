//! Redis Streams implementation of [`FulfillmentQueue`].

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::redis::{self, Value};
use tracing::debug;

use crate::domain::StreamFields;
use crate::domain::ports::{FulfillmentQueue, FulfillmentQueueError, StreamMessage};

use super::RedisPool;
use super::reply::{self, BUSY_GROUP, queue_error};

/// Stream commands over pooled connections.
///
/// Blocking reads hold their connection for the whole block window, so the
/// pool should be sized for one connection per materializer on top of the
/// request-path traffic.
#[derive(Clone)]
pub struct RedisFulfillmentQueue {
    pool: RedisPool,
}

impl RedisFulfillmentQueue {
    /// Stream adapter over `pool`.
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    async fn connection(
        &self,
    ) -> Result<
        bb8_redis::bb8::PooledConnection<'_, bb8_redis::RedisConnectionManager>,
        FulfillmentQueueError,
    > {
        self.pool
            .get()
            .await
            .map_err(|err| FulfillmentQueueError::connection(err.to_string()))
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn read_group_command(
    stream: &str,
    group: &str,
    consumer: &str,
    count: usize,
    block: Duration,
) -> redis::Cmd {
    let mut cmd = redis::cmd("XREADGROUP");
    cmd.arg("GROUP")
        .arg(group)
        .arg(consumer)
        .arg("COUNT")
        .arg(count.max(1));
    // BLOCK 0 would wait forever.
    if !block.is_zero() {
        cmd.arg("BLOCK").arg(millis(block).max(1));
    }
    cmd.arg("STREAMS").arg(stream).arg(">");
    cmd
}

#[async_trait]
impl FulfillmentQueue for RedisFulfillmentQueue {
    async fn append(
        &self,
        stream: &str,
        fields: &StreamFields,
    ) -> Result<String, FulfillmentQueueError> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("XADD");
        cmd.arg(stream).arg("*");
        for (field, value) in fields {
            cmd.arg(field).arg(value);
        }
        cmd.query_async::<String>(&mut *conn)
            .await
            .map_err(|err| queue_error(err, ""))
    }

    async fn ensure_consumer_group(
        &self,
        stream: &str,
        group: &str,
    ) -> Result<(), FulfillmentQueueError> {
        let mut conn = self.connection().await?;
        let created = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(stream)
            .arg(group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async::<()>(&mut *conn)
            .await;
        match created {
            Ok(()) => Ok(()),
            Err(err) if err.code() == Some(BUSY_GROUP) => {
                debug!(stream, group, "consumer group already exists");
                Ok(())
            }
            Err(err) => Err(queue_error(err, group)),
        }
    }

    async fn read_new(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
        block: Duration,
    ) -> Result<Vec<StreamMessage>, FulfillmentQueueError> {
        let mut conn = self.connection().await?;
        let value = read_group_command(stream, group, consumer, count, block)
            .query_async::<Value>(&mut *conn)
            .await
            .map_err(|err| queue_error(err, group))?;
        reply::read_group(&value)
    }

    async fn ack(&self, stream: &str, group: &str, id: &str) -> Result<(), FulfillmentQueueError> {
        let mut conn = self.connection().await?;
        redis::cmd("XACK")
            .arg(stream)
            .arg(group)
            .arg(id)
            .query_async::<i64>(&mut *conn)
            .await
            .map(|_| ())
            .map_err(|err| queue_error(err, group))
    }

    async fn reclaim_idle(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        min_idle: Duration,
        count: usize,
    ) -> Result<Vec<StreamMessage>, FulfillmentQueueError> {
        let mut conn = self.connection().await?;
        let value = redis::cmd("XAUTOCLAIM")
            .arg(stream)
            .arg(group)
            .arg(consumer)
            .arg(millis(min_idle))
            .arg("0-0")
            .arg("COUNT")
            .arg(count.max(1))
            .query_async::<Value>(&mut *conn)
            .await
            .map_err(|err| queue_error(err, group))?;
        reply::auto_claim(&value)
    }
}
