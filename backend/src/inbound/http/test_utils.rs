//! Test helpers for inbound HTTP handlers.

use std::sync::Arc;

use actix_web::web;

use super::state::HttpState;
use crate::domain::ports::{MockSeckillCommand, MockShopCatalogue, MockVoucherCatalogue};

/// Mocks for each driving port; set expectations then call [`Self::into_state`].
#[derive(Default)]
pub struct MockPorts {
    pub seckill: MockSeckillCommand,
    pub vouchers: MockVoucherCatalogue,
    pub shops: MockShopCatalogue,
}

impl MockPorts {
    pub fn into_state(self) -> web::Data<HttpState> {
        web::Data::new(HttpState::new(
            Arc::new(self.seckill),
            Arc::new(self.vouchers),
            Arc::new(self.shops),
        ))
    }
}
