//! Redis-backed [`AdmissionGate`] running one Lua script per attempt.
//!
//! The script reads the stock counter, checks the claim set, then
//! decrements, records the claim, and appends the fulfillment message. Redis
//! runs scripts atomically, so no other command interleaves.

use async_trait::async_trait;
use bb8_redis::redis;
use tracing::debug;

use crate::domain::ports::{
    AdmissionGate, AdmissionGateError, AdmissionOutcome, AdmissionRequest, claim_key, stock_key,
};
use crate::domain::{
    FIELD_ORDER_ID, FIELD_RETRY_COUNT, FIELD_USER_ID, FIELD_VOUCHER_ID, VoucherId,
};

use super::RedisPool;
use super::reply::gate_error;

/// KEYS: stock counter, claim set, order stream.
/// ARGV: voucher id, user id, order id.
/// Returns 0 admitted, 1 out of stock, 2 already claimed, 3 not stocked.
const ADMISSION_SCRIPT: &str = r"
local stock = tonumber(redis.call('get', KEYS[1]))
if stock == nil then
  return 3
end
if stock <= 0 then
  return 1
end
if redis.call('sismember', KEYS[2], ARGV[2]) == 1 then
  return 2
end
redis.call('incrby', KEYS[1], -1)
redis.call('sadd', KEYS[2], ARGV[2])
redis.call('xadd', KEYS[3], '*',
  ARGV[4], ARGV[1], ARGV[5], ARGV[2], ARGV[6], ARGV[3], ARGV[7], '0')
return 0
";

/// Admission gate backed by one `EVAL` per attempt.
#[derive(Clone)]
pub struct RedisAdmissionGate {
    pool: RedisPool,
    order_stream: String,
}

impl RedisAdmissionGate {
    /// Gate appending admitted orders to `order_stream`.
    pub fn new(pool: RedisPool, order_stream: impl Into<String>) -> Self {
        Self {
            pool,
            order_stream: order_stream.into(),
        }
    }

    fn script_command(&self, request: &AdmissionRequest) -> redis::Cmd {
        let mut cmd = redis::cmd("EVAL");
        cmd.arg(ADMISSION_SCRIPT)
            .arg(3)
            .arg(stock_key(request.voucher_id))
            .arg(claim_key(request.voucher_id))
            .arg(&self.order_stream)
            .arg(request.voucher_id.get())
            .arg(request.user_id.get())
            .arg(request.order_id.get())
            .arg(FIELD_VOUCHER_ID)
            .arg(FIELD_USER_ID)
            .arg(FIELD_ORDER_ID)
            .arg(FIELD_RETRY_COUNT);
        cmd
    }
}

#[async_trait]
impl AdmissionGate for RedisAdmissionGate {
    async fn admit(
        &self,
        request: &AdmissionRequest,
    ) -> Result<AdmissionOutcome, AdmissionGateError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| AdmissionGateError::unavailable(err.to_string()))?;
        let code = self
            .script_command(request)
            .query_async::<i64>(&mut *conn)
            .await
            .map_err(gate_error)?;
        AdmissionOutcome::from_code(code)
            .ok_or_else(|| AdmissionGateError::script(format!("unexpected result code {code}")))
    }

    async fn prime_stock(
        &self,
        voucher_id: VoucherId,
        stock: i32,
    ) -> Result<bool, AdmissionGateError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| AdmissionGateError::unavailable(err.to_string()))?;
        let reply = redis::cmd("SET")
            .arg(stock_key(voucher_id))
            .arg(stock)
            .arg("NX")
            .query_async::<Option<String>>(&mut *conn)
            .await
            .map_err(gate_error)?;
        let primed = reply.is_some();
        debug!(%voucher_id, stock, primed, "primed stock counter");
        Ok(primed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn script_writes_every_message_field() {
        for index in 4..=7 {
            assert!(ADMISSION_SCRIPT.contains(&format!("ARGV[{index}]")));
        }
        assert!(ADMISSION_SCRIPT.contains("'0'"));
    }

    #[rstest]
    fn script_checks_stock_before_claims() {
        let stock_check = ADMISSION_SCRIPT.find("stock <= 0").expect("stock check");
        let claim_check = ADMISSION_SCRIPT.find("sismember").expect("claim check");
        let decrement = ADMISSION_SCRIPT.find("incrby").expect("decrement");
        assert!(stock_check < claim_check);
        assert!(claim_check < decrement);
    }
}
