//! Port for the atomic admission decision.
//!
//! One call checks stock, checks and records the buyer's claim, decrements the
//! stock copy, and appends the fulfillment message. Adapters must perform the
//! whole step atomically: either every effect is applied or none is.
use async_trait::async_trait;

use crate::domain::{OrderId, UserId, VoucherId};

use super::define_port_error;

/// Prefix of the per-voucher stock counter key.
pub const STOCK_KEY_PREFIX: &str = "seckill:stock:";
/// Prefix of the per-voucher claim set key.
pub const CLAIM_KEY_PREFIX: &str = "seckill:order:";

/// Stock counter key for `voucher_id`.
pub fn stock_key(voucher_id: VoucherId) -> String {
    format!("{STOCK_KEY_PREFIX}{voucher_id}")
}

/// Claim set key for `voucher_id`.
pub fn claim_key(voucher_id: VoucherId) -> String {
    format!("{CLAIM_KEY_PREFIX}{voucher_id}")
}

define_port_error! {
    /// Errors surfaced by admission gate adapters. All are retryable.
    pub enum AdmissionGateError {
        /// Store is unreachable or a pooled connection could not be obtained.
        Unavailable { message: String } => "admission store unavailable: {message}",
        /// The atomic step failed or returned an unexpected result.
        Script { message: String } => "admission script failed: {message}",
    }
}

/// Input of one admission attempt. The order id is allocated beforehand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionRequest {
    /// Voucher whose stock is reserved.
    pub voucher_id: VoucherId,
    /// Buyer; at most one admission per voucher.
    pub user_id: UserId,
    /// Identifier written into the fulfillment message.
    pub order_id: OrderId,
}

/// Decision returned by the atomic step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// Stock reserved, claim recorded, fulfillment message appended.
    Admitted,
    /// No stock remains.
    OutOfStock,
    /// The buyer already holds a claim on this voucher.
    AlreadyClaimed,
    /// No stock counter exists for the voucher.
    NotStocked,
}

impl AdmissionOutcome {
    /// Decode the numeric result of the admission script.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Admitted),
            1 => Some(Self::OutOfStock),
            2 => Some(Self::AlreadyClaimed),
            3 => Some(Self::NotStocked),
            _ => None,
        }
    }
}

/// Atomic stock reservation and fulfillment enqueue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdmissionGate: Send + Sync {
    /// Run the atomic admission step.
    async fn admit(
        &self,
        request: &AdmissionRequest,
    ) -> Result<AdmissionOutcome, AdmissionGateError>;

    /// Initialise the stock counter unless one already exists. Returns
    /// whether this call wrote it, so concurrent primes never reset a
    /// counter that admissions have already decremented.
    async fn prime_stock(
        &self,
        voucher_id: VoucherId,
        stock: i32,
    ) -> Result<bool, AdmissionGateError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, Some(AdmissionOutcome::Admitted))]
    #[case(1, Some(AdmissionOutcome::OutOfStock))]
    #[case(2, Some(AdmissionOutcome::AlreadyClaimed))]
    #[case(3, Some(AdmissionOutcome::NotStocked))]
    #[case(-1, None)]
    #[case(4, None)]
    fn script_codes_decode(#[case] code: i64, #[case] expected: Option<AdmissionOutcome>) {
        assert_eq!(AdmissionOutcome::from_code(code), expected);
    }

    #[rstest]
    fn keys_are_namespaced_per_voucher() {
        assert_eq!(stock_key(VoucherId::new(5)), "seckill:stock:5");
        assert_eq!(claim_key(VoucherId::new(5)), "seckill:order:5");
    }
}
