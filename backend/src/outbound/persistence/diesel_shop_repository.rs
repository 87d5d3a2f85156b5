//! PostgreSQL-backed `ShopRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{ShopRepository, ShopRepositoryError};
use crate::domain::{Shop, ShopDraft, ShopId, ShopType};

use super::diesel_basic_error_mapping::{
    from_db_id, map_basic_diesel_error, map_basic_pool_error, to_db_id,
};
use super::models::{ShopRow, ShopTypeRow, ShopWriteRow};
use super::pool::{DbPool, PoolError};
use super::schema::{tb_shop, tb_shop_type};

/// Diesel-backed implementation of the `ShopRepository` port.
#[derive(Clone)]
pub struct DieselShopRepository {
    pool: DbPool,
}

impl DieselShopRepository {
    /// Repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ShopRepositoryError {
    map_basic_pool_error(error, ShopRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> ShopRepositoryError {
    map_basic_diesel_error(
        error,
        ShopRepositoryError::query,
        ShopRepositoryError::connection,
    )
}

fn db_id(id: u64) -> Result<i64, ShopRepositoryError> {
    to_db_id(id).map_err(ShopRepositoryError::query)
}

fn domain_id(id: i64) -> Result<u64, ShopRepositoryError> {
    from_db_id(id).map_err(ShopRepositoryError::query)
}

fn row_to_shop(row: ShopRow) -> Result<Shop, ShopRepositoryError> {
    Ok(Shop {
        id: ShopId::new(domain_id(row.id)?),
        name: row.name,
        type_id: domain_id(row.type_id)?,
        images: row.images,
        area: row.area,
        address: row.address,
        avg_price: row.avg_price,
        sold: row.sold,
        comments: row.comments,
        score: row.score,
        open_hours: row.open_hours,
    })
}

fn row_to_shop_type(row: ShopTypeRow) -> Result<ShopType, ShopRepositoryError> {
    Ok(ShopType {
        id: domain_id(row.id)?,
        name: row.name,
        icon: row.icon,
        sort: row.sort,
    })
}

fn write_row(shop: &Shop) -> Result<ShopWriteRow<'_>, ShopRepositoryError> {
    Ok(ShopWriteRow {
        name: &shop.name,
        type_id: db_id(shop.type_id)?,
        images: &shop.images,
        area: shop.area.as_deref(),
        address: &shop.address,
        avg_price: shop.avg_price,
        sold: shop.sold,
        comments: shop.comments,
        score: shop.score,
        open_hours: shop.open_hours.as_deref(),
    })
}

#[async_trait]
impl ShopRepository for DieselShopRepository {
    async fn find_by_id(&self, id: ShopId) -> Result<Option<Shop>, ShopRepositoryError> {
        let id = db_id(id.get())?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<ShopRow> = tb_shop::table
            .filter(tb_shop::id.eq(id))
            .select(ShopRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_shop).transpose()
    }

    async fn create(&self, draft: &ShopDraft) -> Result<ShopId, ShopRepositoryError> {
        // Placeholder id; the column default assigns the real one.
        let shop = draft.clone().into_shop(ShopId::new(0));
        let row = write_row(&shop)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let id: i64 = diesel::insert_into(tb_shop::table)
            .values(&row)
            .returning(tb_shop::id)
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        domain_id(id).map(ShopId::new)
    }

    async fn update(&self, shop: &Shop) -> Result<bool, ShopRepositoryError> {
        let id = db_id(shop.id.get())?;
        let row = write_row(shop)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(tb_shop::table.filter(tb_shop::id.eq(id)))
            .set((&row, tb_shop::updated_at.eq(diesel::dsl::now)))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(updated > 0)
    }

    async fn delete(&self, id: ShopId) -> Result<bool, ShopRepositoryError> {
        let id = db_id(id.get())?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(tb_shop::table.filter(tb_shop::id.eq(id)))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(deleted > 0)
    }

    async fn list_types(&self) -> Result<Vec<ShopType>, ShopRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<ShopTypeRow> = tb_shop_type::table
            .order(tb_shop_type::sort.asc())
            .select(ShopTypeRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter().map(row_to_shop_type).collect()
    }
}
