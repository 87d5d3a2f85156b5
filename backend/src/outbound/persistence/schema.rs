//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Identifiers
//! are `BIGINT`; the adapters convert to and from the domain's `u64` ids.

diesel::table! {
    /// Voucher catalogue, ordinary and seckill alike.
    tb_voucher (id) {
        id -> Int8,
        shop_id -> Int8,
        title -> Varchar,
        sub_title -> Nullable<Varchar>,
        rules -> Nullable<Varchar>,
        /// Price paid, in cents.
        pay_value -> Int8,
        /// Face value, in cents.
        actual_value -> Int8,
        /// 0 ordinary, 1 seckill.
        kind -> Int2,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Seckill terms and the authoritative stock, one row per seckill voucher.
    tb_seckill_voucher (voucher_id) {
        voucher_id -> Int8,
        stock -> Int4,
        begin_time -> Timestamptz,
        end_time -> Timestamptz,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Materialized orders. `(voucher_id, user_id)` is unique.
    tb_voucher_order (id) {
        id -> Int8,
        user_id -> Int8,
        voucher_id -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    tb_shop (id) {
        id -> Int8,
        name -> Varchar,
        type_id -> Int8,
        images -> Varchar,
        area -> Nullable<Varchar>,
        address -> Varchar,
        avg_price -> Nullable<Int8>,
        sold -> Int4,
        comments -> Int4,
        score -> Int4,
        open_hours -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    tb_shop_type (id) {
        id -> Int8,
        name -> Varchar,
        icon -> Varchar,
        sort -> Int4,
    }
}

diesel::joinable!(tb_seckill_voucher -> tb_voucher (voucher_id));
diesel::joinable!(tb_voucher_order -> tb_voucher (voucher_id));

diesel::allow_tables_to_appear_in_same_query!(
    tb_voucher,
    tb_seckill_voucher,
    tb_voucher_order,
    tb_shop,
    tb_shop_type,
);
