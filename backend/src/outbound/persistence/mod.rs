//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repository implementations translate between Diesel rows and domain types
//! and hold no business rules. Row structs (`models.rs`) and table
//! definitions (`schema.rs`) never leave this module.
//!
//! # Example
//!
//! ```no_run
//! # async fn wire() -> Result<(), Box<dyn std::error::Error>> {
//! use seckill::outbound::persistence::{DbPool, DieselVoucherRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/seckill")).await?;
//! let vouchers = DieselVoucherRepository::new(pool);
//! # let _ = vouchers;
//! # Ok(())
//! # }
//! ```

mod diesel_basic_error_mapping;
mod diesel_shop_repository;
mod diesel_voucher_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_shop_repository::DieselShopRepository;
pub use diesel_voucher_repository::DieselVoucherRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
