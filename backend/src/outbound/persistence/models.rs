//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::{tb_seckill_voucher, tb_shop, tb_shop_type, tb_voucher, tb_voucher_order};

// ---------------------------------------------------------------------------
// Voucher models
// ---------------------------------------------------------------------------

/// Insertable struct for the voucher catalogue row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tb_voucher)]
pub(crate) struct NewVoucherRow<'a> {
    pub shop_id: i64,
    pub title: &'a str,
    pub sub_title: Option<&'a str>,
    pub rules: Option<&'a str>,
    pub pay_value: i64,
    pub actual_value: i64,
    pub kind: i16,
}

/// Row struct for reading seckill terms.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tb_seckill_voucher)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SeckillVoucherRow {
    pub voucher_id: i64,
    pub stock: i32,
    pub begin_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Insertable struct for seckill terms.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tb_seckill_voucher)]
pub(crate) struct NewSeckillVoucherRow {
    pub voucher_id: i64,
    pub stock: i32,
    pub begin_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Insertable struct for a materialized order.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tb_voucher_order)]
pub(crate) struct NewVoucherOrderRow {
    pub id: i64,
    pub user_id: i64,
    pub voucher_id: i64,
}

// ---------------------------------------------------------------------------
// Shop models
// ---------------------------------------------------------------------------

/// Row struct for reading shops.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tb_shop)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ShopRow {
    pub id: i64,
    pub name: String,
    pub type_id: i64,
    pub images: String,
    pub area: Option<String>,
    pub address: String,
    pub avg_price: Option<i64>,
    pub sold: i32,
    pub comments: i32,
    pub score: i32,
    pub open_hours: Option<String>,
}

/// Insertable struct for new shops and changeset for updates.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = tb_shop)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ShopWriteRow<'a> {
    pub name: &'a str,
    pub type_id: i64,
    pub images: &'a str,
    pub area: Option<&'a str>,
    pub address: &'a str,
    pub avg_price: Option<i64>,
    pub sold: i32,
    pub comments: i32,
    pub score: i32,
    pub open_hours: Option<&'a str>,
}

/// Row struct for reading shop types.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tb_shop_type)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ShopTypeRow {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub sort: i32,
}
