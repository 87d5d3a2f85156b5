//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every handler under `inbound::http` and the schema
//! wrappers from `inbound::http::schemas`, which describe domain types
//! without coupling them to utoipa. Swagger UI serves it in debug builds and
//! `cargo run --bin openapi-dump` prints it.

use utoipa::OpenApi;

use crate::inbound::http::schemas::{
    ErrorCodeSchema, ErrorSchema, SeckillVoucherSchema, ShopSchema, ShopTypeSchema,
};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Seckill API",
        description = "Flash-sale admission, voucher catalogue, and cached shop reads."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::seckill::claim_seckill,
        crate::inbound::http::vouchers::create_voucher,
        crate::inbound::http::vouchers::get_seckill_voucher,
        crate::inbound::http::shops::get_shop,
        crate::inbound::http::shops::create_shop,
        crate::inbound::http::shops::update_shop,
        crate::inbound::http::shops::delete_shop,
        crate::inbound::http::shops::list_shop_types,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        SeckillVoucherSchema,
        ShopSchema,
        ShopTypeSchema
    )),
    tags(
        (name = "seckill", description = "Flash-sale admission"),
        (name = "vouchers", description = "Voucher catalogue"),
        (name = "shops", description = "Cached shop catalogue"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
