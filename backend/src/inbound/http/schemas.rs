//! OpenAPI schema definitions for domain types.
//!
//! Domain types stay framework-agnostic and do not derive `ToSchema`. The
//! wrappers here mirror their JSON shape and register under the domain
//! type's path so handler annotations can refer to the domain types.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// The requested resource does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// No stock remains for the seckill voucher.
    #[schema(rename = "out_of_stock")]
    OutOfStock,
    /// The buyer already holds an admission for the voucher.
    #[schema(rename = "already_claimed")]
    AlreadyClaimed,
    /// The request conflicts with current state.
    #[schema(rename = "conflict")]
    Conflict,
    /// A backing store is unreachable; retry later.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error, rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "out_of_stock")]
    code: ErrorCodeSchema,
    /// Human-readable message returned to clients.
    #[schema(example = "voucher 7 is sold out")]
    message: String,
    /// Correlation identifier, also sent as the `trace-id` header.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
    /// Supplementary details, such as the offending field.
    details: Option<serde_json::Value>,
}

/// OpenAPI schema for [`crate::domain::SeckillVoucher`].
#[derive(ToSchema)]
#[schema(as = crate::domain::SeckillVoucher, rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct SeckillVoucherSchema {
    #[schema(example = 7)]
    voucher_id: u64,
    /// Stock recorded by the relational store.
    #[schema(example = 100)]
    stock: i32,
    #[schema(value_type = String, format = DateTime)]
    begin_time: String,
    #[schema(value_type = String, format = DateTime)]
    end_time: String,
}

/// OpenAPI schema for [`crate::domain::Shop`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Shop, rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ShopSchema {
    #[schema(example = 1)]
    id: u64,
    #[schema(example = "Noodle Bar")]
    name: String,
    type_id: u64,
    images: String,
    area: Option<String>,
    address: String,
    /// Average spend per visit, in cents.
    avg_price: Option<i64>,
    sold: i32,
    comments: i32,
    /// Rating in tenths of a star.
    #[schema(minimum = 0, maximum = 50)]
    score: i32,
    open_hours: Option<String>,
}

/// OpenAPI schema for [`crate::domain::ShopType`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ShopType)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ShopTypeSchema {
    id: u64,
    #[schema(example = "Food")]
    name: String,
    icon: String,
    sort: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use utoipa::PartialSchema;

    fn schema_to_json<T: PartialSchema>() -> String {
        serde_json::to_string(&T::schema()).expect("schema serialises to JSON")
    }

    #[rstest]
    fn error_schema_registers_under_domain_name() {
        // utoipa replaces :: with . in schema names
        assert_eq!(ErrorSchema::name(), "crate.domain.Error");
        let schema_json = schema_to_json::<ErrorSchema>();
        assert!(schema_json.contains("traceId"), "camelCase trace id");
    }

    #[rstest]
    #[case("out_of_stock")]
    #[case("already_claimed")]
    #[case("service_unavailable")]
    #[case("internal_error")]
    fn error_code_schema_lists_each_variant(#[case] variant: &str) {
        let schema_json = schema_to_json::<ErrorCodeSchema>();
        assert!(schema_json.contains(variant), "missing {variant}");
    }

    #[rstest]
    fn catalogue_schemas_use_camel_case_fields() {
        assert!(schema_to_json::<SeckillVoucherSchema>().contains("beginTime"));
        assert!(schema_to_json::<ShopSchema>().contains("openHours"));
        assert_eq!(ShopTypeSchema::name(), "crate.domain.ShopType");
    }
}
