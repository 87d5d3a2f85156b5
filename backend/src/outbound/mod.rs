//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL repositories using Diesel.
//! - **redis**: read cache store, admission gate script, and fulfillment
//!   stream over a shared Redis pool.
//! - **memory**: in-process stand-ins for both, used in development mode and
//!   by the integration tests.
//!
//! Adapters translate between domain types and store representations. They
//! contain no business rules.

pub mod memory;
pub mod persistence;
pub mod redis;
