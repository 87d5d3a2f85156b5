//! In-process adapters used for local development and tests.
//!
//! `InMemoryStore` stands in for Redis (cache, admission gate, stream) and
//! `InMemoryRelationalStore` for PostgreSQL.

mod relational;
mod store;
mod stream;

pub use relational::InMemoryRelationalStore;
pub use store::InMemoryStore;
