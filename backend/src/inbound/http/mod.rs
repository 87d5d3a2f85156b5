//! HTTP inbound adapter exposing the `/api/v1` REST surface.

pub mod error;
pub mod health;
pub mod schemas;
pub mod seckill;
pub mod shops;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;
pub mod vouchers;

use actix_web::{Scope, web};
use tracing::debug;

pub use error::ApiResult;

use crate::domain::Error;

/// JSON extractor configuration mapping malformed bodies to `invalid_request`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        debug!(error = %err, "rejected request body");
        Error::invalid_request(format!("malformed request body: {err}")).into()
    })
}

/// The `/api/v1` scope with every catalogue and seckill route.
pub fn api_scope() -> Scope {
    web::scope("/api/v1")
        .service(seckill::claim_seckill)
        .service(vouchers::create_voucher)
        .service(vouchers::get_seckill_voucher)
        .service(shops::get_shop)
        .service(shops::create_shop)
        .service(shops::update_shop)
        .service(shops::delete_shop)
        .service(shops::list_shop_types)
}
