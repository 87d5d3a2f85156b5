//! Domain primitives, services, and ports.
//!
//! Purpose: hold the seckill admission rules, the order materialization
//! state machine, and the cache-aside read discipline independently of any
//! transport or store. Adapters live in `inbound` and `outbound`.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - SeckillService: admission and voucher catalogue (driving ports).
//! - ShopService: cached shop catalogue (driving port).
//! - OrderMaterializer: fulfillment stream consumer.
//! - SonyflakeAllocator: order id allocation.
//! - ReadCache / RequestCoalescer: cache-aside engine.

pub mod coalesce;
pub mod error;
pub mod fulfillment;
pub mod id_allocator;
pub mod ids;
pub mod order_materializer;
pub mod ports;
pub mod read_cache;
pub mod seckill_service;
pub mod shop;
pub mod shop_service;
pub mod voucher;

pub use self::coalesce::RequestCoalescer;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::fulfillment::{
    DEAD_LETTER_STREAM, DeadLetterEntry, FIELD_ORDER_ID, FIELD_RETRY_COUNT, FIELD_USER_ID,
    FIELD_VOUCHER_ID, FulfillmentMessage, FulfillmentMessageError, ORDER_GROUP, ORDER_STREAM,
    StreamFields,
};
pub use self::id_allocator::{IdAllocatorConfig, IdParts, SonyflakeAllocator, decompose};
pub use self::ids::{OrderId, ShopId, UserId, VoucherId};
pub use self::order_materializer::{
    AttemptJitter, BackoffJitter, MessageDisposition, OrderMaterializer, OrderMaterializerConfig,
    OrderMaterializerPorts, OrderMaterializerRuntime, RetrySleeper, TokioSleeper,
};
pub use self::read_cache::{CacheTtlPolicy, RandomTtlJitter, ReadCache, TtlJitter};
pub use self::seckill_service::{SeckillService, SeckillServicePorts};
pub use self::shop::{Shop, ShopDraft, ShopType, ShopValidationError};
pub use self::shop_service::ShopService;
pub use self::voucher::{
    NewVoucher, SaleWindow, SeckillTerms, SeckillVoucher, UnknownVoucherKind, Voucher, VoucherKind,
    VoucherOrder, VoucherValidationError,
};

/// Convenient result alias for driving ports.
///
/// # Examples
/// ```
/// use seckill::domain::{ApiResult, Error};
///
/// fn lookup() -> ApiResult<u64> {
///     Err(Error::not_found("nope"))
/// }
/// assert!(lookup().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
