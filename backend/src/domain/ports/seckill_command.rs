//! Driving port for seckill admission.
use async_trait::async_trait;

use crate::domain::{Error, OrderId, UserId, VoucherId};

/// Buyer request to claim one unit of a seckill voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeckillRequest {
    /// Voucher being claimed.
    pub voucher_id: VoucherId,
    /// Buyer making the claim.
    pub user_id: UserId,
}

/// Driving port for flash-sale claims.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SeckillCommand: Send + Sync {
    /// Admit the buyer and return the order id allocated for them.
    ///
    /// The order row is written asynchronously; a successful return means the
    /// claim is recorded and the fulfillment message is durable.
    async fn claim(&self, request: SeckillRequest) -> Result<OrderId, Error>;
}
