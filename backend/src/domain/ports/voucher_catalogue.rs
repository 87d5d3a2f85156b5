//! Driving port for voucher creation and seckill metadata reads.
use async_trait::async_trait;

use crate::domain::{Error, NewVoucher, SeckillVoucher, VoucherId};

/// Driving port for voucher administration and reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoucherCatalogue: Send + Sync {
    /// Create a voucher. Seckill vouchers also have their stock primed in
    /// the admission store.
    async fn create_voucher(&self, voucher: NewVoucher) -> Result<VoucherId, Error>;

    /// Read seckill terms through the read cache.
    async fn seckill_voucher(&self, voucher_id: VoucherId) -> Result<SeckillVoucher, Error>;
}
