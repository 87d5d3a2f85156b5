//! Flash-sale ("seckill") backend.
//!
//! Admission runs entirely against the in-memory store: one atomic step
//! reserves stock, records the buyer's claim, and appends a fulfillment
//! message. Order materializers drain that stream into the relational store
//! with retries and a dead-letter stream. Catalogue reads go through a
//! cache-aside read cache with a penetration sentinel and request coalescing.

#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), forbid(clippy::expect_used))]

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
