//! PostgreSQL-backed `VoucherRepository` implementation using Diesel ORM.
//!
//! Order materialization runs in one transaction:
//!
//! 1. insert the order row with `ON CONFLICT DO NOTHING`, which covers both a
//!    replayed order id and a second order for the same buyer;
//! 2. when a row was inserted, decrement stock with a `stock > 0` guard;
//! 3. when the guard matches nothing, roll back and report exhaustion.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{MaterializeOutcome, VoucherRepository, VoucherRepositoryError};
use crate::domain::{NewVoucher, SeckillVoucher, VoucherId, VoucherOrder};

use super::diesel_basic_error_mapping::{
    from_db_id, map_basic_diesel_error, map_basic_pool_error, to_db_id,
};
use super::models::{NewSeckillVoucherRow, NewVoucherOrderRow, NewVoucherRow, SeckillVoucherRow};
use super::pool::{DbPool, PoolError};
use super::schema::{tb_seckill_voucher, tb_voucher, tb_voucher_order};

/// Diesel-backed implementation of the `VoucherRepository` port.
#[derive(Clone)]
pub struct DieselVoucherRepository {
    pool: DbPool,
}

impl DieselVoucherRepository {
    /// Repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> VoucherRepositoryError {
    map_basic_pool_error(error, VoucherRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> VoucherRepositoryError {
    map_basic_diesel_error(
        error,
        VoucherRepositoryError::query,
        VoucherRepositoryError::connection,
    )
}

fn db_id(id: u64) -> Result<i64, VoucherRepositoryError> {
    to_db_id(id).map_err(VoucherRepositoryError::query)
}

/// Failure inside the materialization transaction. Both variants roll back.
#[derive(Debug)]
enum MaterializeTxError {
    Diesel(diesel::result::Error),
    StockExhausted,
}

impl From<diesel::result::Error> for MaterializeTxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

fn row_to_seckill(row: SeckillVoucherRow) -> Result<SeckillVoucher, VoucherRepositoryError> {
    Ok(SeckillVoucher {
        voucher_id: VoucherId::new(
            from_db_id(row.voucher_id).map_err(VoucherRepositoryError::query)?,
        ),
        stock: row.stock,
        begin_time: row.begin_time,
        end_time: row.end_time,
    })
}

#[async_trait]
impl VoucherRepository for DieselVoucherRepository {
    async fn reduce_stock_and_insert_order(
        &self,
        order: &VoucherOrder,
    ) -> Result<MaterializeOutcome, VoucherRepositoryError> {
        let voucher_id = db_id(order.voucher_id.get())?;
        let row = NewVoucherOrderRow {
            id: db_id(order.id.get())?,
            user_id: db_id(order.user_id.get())?,
            voucher_id,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let result = conn
            .transaction::<_, MaterializeTxError, _>(|conn| {
                async move {
                    let inserted = diesel::insert_into(tb_voucher_order::table)
                        .values(&row)
                        .on_conflict_do_nothing()
                        .execute(conn)
                        .await?;
                    if inserted == 0 {
                        return Ok(MaterializeOutcome::AlreadyMaterialized);
                    }

                    let decremented = diesel::update(
                        tb_seckill_voucher::table
                            .filter(tb_seckill_voucher::voucher_id.eq(voucher_id))
                            .filter(tb_seckill_voucher::stock.gt(0)),
                    )
                    .set((
                        tb_seckill_voucher::stock.eq(tb_seckill_voucher::stock - 1),
                        tb_seckill_voucher::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)
                    .await?;
                    if decremented == 0 {
                        return Err(MaterializeTxError::StockExhausted);
                    }
                    Ok(MaterializeOutcome::Created)
                }
                .scope_boxed()
            })
            .await;

        match result {
            Ok(outcome) => {
                debug!(order_id = %order.id, ?outcome, "order materialization committed");
                Ok(outcome)
            }
            Err(MaterializeTxError::StockExhausted) => Err(
                VoucherRepositoryError::stock_exhausted(order.voucher_id.get()),
            ),
            Err(MaterializeTxError::Diesel(error)) => Err(map_diesel_error(error)),
        }
    }

    async fn find_seckill_voucher(
        &self,
        voucher_id: VoucherId,
    ) -> Result<Option<SeckillVoucher>, VoucherRepositoryError> {
        let id = db_id(voucher_id.get())?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<SeckillVoucherRow> = tb_seckill_voucher::table
            .filter(tb_seckill_voucher::voucher_id.eq(id))
            .select(SeckillVoucherRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_seckill).transpose()
    }

    async fn create_voucher(
        &self,
        voucher: &NewVoucher,
    ) -> Result<VoucherId, VoucherRepositoryError> {
        let new_voucher = NewVoucherRow {
            shop_id: db_id(voucher.shop_id.get())?,
            title: &voucher.title,
            sub_title: voucher.sub_title.as_deref(),
            rules: voucher.rules.as_deref(),
            pay_value: voucher.pay_value,
            actual_value: voucher.actual_value,
            kind: i16::from(u8::from(voucher.kind)),
        };
        let terms = voucher.seckill.clone();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let id = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    let id: i64 = diesel::insert_into(tb_voucher::table)
                        .values(&new_voucher)
                        .returning(tb_voucher::id)
                        .get_result(conn)
                        .await?;
                    if let Some(terms) = terms {
                        diesel::insert_into(tb_seckill_voucher::table)
                            .values(&NewSeckillVoucherRow {
                                voucher_id: id,
                                stock: terms.stock,
                                begin_time: terms.begin_time,
                                end_time: terms.end_time,
                            })
                            .execute(conn)
                            .await?;
                    }
                    Ok(id)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        from_db_id(id)
            .map(VoucherId::new)
            .map_err(VoucherRepositoryError::query)
    }

    async fn count_orders(&self, voucher_id: VoucherId) -> Result<u64, VoucherRepositoryError> {
        let id = db_id(voucher_id.get())?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let count: i64 = tb_voucher_order::table
            .filter(tb_voucher_order::voucher_id.eq(id))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        from_db_id(count).map_err(VoucherRepositoryError::query)
    }
}
