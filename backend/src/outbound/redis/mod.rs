//! Redis adapters: read cache store, admission gate, and fulfillment stream.
//!
//! All three share one [`RedisPool`]. Commands are issued through the
//! `redis` crate re-exported by `bb8-redis` so the pool and the client
//! always agree on versions.

mod admission_gate;
mod cache_store;
mod fulfillment_queue;
mod pool;
mod reply;

pub use admission_gate::RedisAdmissionGate;
pub use cache_store::RedisCacheStore;
pub use fulfillment_queue::RedisFulfillmentQueue;
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError};
