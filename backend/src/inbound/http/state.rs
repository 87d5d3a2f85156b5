//! Shared HTTP adapter state.
//!
//! Handlers receive this through `actix_web::web::Data` and depend only on
//! driving ports, so they can be tested against mocks without any store.

use std::sync::Arc;

use crate::domain::ports::{SeckillCommand, ShopCatalogue, VoucherCatalogue};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Claim handling.
    pub seckill: Arc<dyn SeckillCommand>,
    /// Voucher administration and reads.
    pub vouchers: Arc<dyn VoucherCatalogue>,
    /// Shop catalogue.
    pub shops: Arc<dyn ShopCatalogue>,
}

impl HttpState {
    pub fn new(
        seckill: Arc<dyn SeckillCommand>,
        vouchers: Arc<dyn VoucherCatalogue>,
        shops: Arc<dyn ShopCatalogue>,
    ) -> Self {
        Self {
            seckill,
            vouchers,
            shops,
        }
    }
}
