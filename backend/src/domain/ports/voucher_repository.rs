//! Port for relational voucher persistence.
//!
//! The relational store owns the authoritative seckill stock. It is mutated
//! only by [`VoucherRepository::reduce_stock_and_insert_order`], which the
//! order materializer calls once per fulfillment message.
use async_trait::async_trait;

use crate::domain::{NewVoucher, SeckillVoucher, VoucherId, VoucherOrder};

use super::define_port_error;

define_port_error! {
    /// Errors raised by voucher repository adapters.
    pub enum VoucherRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "voucher repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "voucher repository query failed: {message}",
        /// The conditional stock decrement matched no row.
        StockExhausted { voucher_id: u64 } => "stock exhausted for voucher {voucher_id}",
    }
}

/// Result of a successful materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeOutcome {
    /// The order row was inserted and stock decremented.
    Created,
    /// An order with the same id, or for the same buyer and voucher, already
    /// exists. Nothing changed.
    AlreadyMaterialized,
}

/// Relational access to vouchers and materialized orders.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoucherRepository: Send + Sync {
    /// Insert `order` and decrement stock in one transaction.
    ///
    /// A duplicate order is reported as
    /// [`MaterializeOutcome::AlreadyMaterialized`] without touching stock.
    /// When stock is already zero the transaction rolls back with
    /// [`VoucherRepositoryError::StockExhausted`].
    async fn reduce_stock_and_insert_order(
        &self,
        order: &VoucherOrder,
    ) -> Result<MaterializeOutcome, VoucherRepositoryError>;

    /// Fetch seckill terms for a voucher.
    async fn find_seckill_voucher(
        &self,
        voucher_id: VoucherId,
    ) -> Result<Option<SeckillVoucher>, VoucherRepositoryError>;

    /// Insert a voucher, plus its seckill terms when present, and return the
    /// allocated id.
    async fn create_voucher(
        &self,
        voucher: &NewVoucher,
    ) -> Result<VoucherId, VoucherRepositoryError>;

    /// Count materialized orders for a voucher.
    async fn count_orders(&self, voucher_id: VoucherId) -> Result<u64, VoucherRepositoryError>;
}
