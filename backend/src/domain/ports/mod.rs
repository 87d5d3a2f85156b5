//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (stores, streams, allocators) are implemented by outbound
//! adapters. Driving ports (`SeckillCommand`, `VoucherCatalogue`,
//! `ShopCatalogue`) are implemented by domain services and called by the HTTP
//! adapter.

mod macros;
pub(crate) use macros::define_port_error;

mod admission_gate;
mod cache_key;
mod cache_store;
mod fulfillment_queue;
mod order_id_allocator;
mod seckill_command;
mod shop_catalogue;
mod shop_repository;
mod voucher_catalogue;
mod voucher_repository;

#[cfg(test)]
pub use admission_gate::MockAdmissionGate;
pub use admission_gate::{
    AdmissionGate, AdmissionGateError, AdmissionOutcome, AdmissionRequest, CLAIM_KEY_PREFIX,
    STOCK_KEY_PREFIX, claim_key, stock_key,
};
pub use cache_key::{CacheKey, CacheKeyValidationError};
#[cfg(test)]
pub use cache_store::MockCacheStore;
pub use cache_store::{CacheStore, CacheStoreError};
#[cfg(test)]
pub use fulfillment_queue::MockFulfillmentQueue;
pub use fulfillment_queue::{FulfillmentQueue, FulfillmentQueueError, StreamMessage};
#[cfg(test)]
pub use order_id_allocator::MockOrderIdAllocator;
pub use order_id_allocator::{IdAllocatorError, OrderIdAllocator};
#[cfg(test)]
pub use seckill_command::MockSeckillCommand;
pub use seckill_command::{SeckillCommand, SeckillRequest};
#[cfg(test)]
pub use shop_catalogue::MockShopCatalogue;
pub use shop_catalogue::ShopCatalogue;
#[cfg(test)]
pub use shop_repository::MockShopRepository;
pub use shop_repository::{ShopRepository, ShopRepositoryError};
#[cfg(test)]
pub use voucher_catalogue::MockVoucherCatalogue;
pub use voucher_catalogue::VoucherCatalogue;
#[cfg(test)]
pub use voucher_repository::MockVoucherRepository;
pub use voucher_repository::{MaterializeOutcome, VoucherRepository, VoucherRepositoryError};
