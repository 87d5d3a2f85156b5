//! Voucher catalogue endpoints.
//!
//! ```text
//! POST /api/v1/voucher {"shopId":1,"title":"50 off","payValue":100,"actualValue":5000,"type":1,
//!                       "stock":100,"beginTime":"2026-11-11 20:00:00","endTime":"2026-11-11 21:00:00"}
//! GET /api/v1/voucher/seckill/7
//! ```

use actix_web::{get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::{
    Error, NewVoucher, SeckillTerms, SeckillVoucher, ShopId, VoucherId, VoucherKind,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ErrorSchema, SeckillVoucherSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    IdInput, missing_field_error, parse_date_time, parse_path_id, require_id,
};

/// Voucher creation request. `type` is `0` for ordinary and `1` for seckill;
/// seckill vouchers also need `stock`, `beginTime`, and `endTime`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVoucherRequest {
    #[serde(default)]
    #[schema(value_type = u64, example = 1)]
    pub shop_id: Option<IdInput>,
    pub title: String,
    #[serde(default)]
    pub sub_title: Option<String>,
    #[serde(default)]
    pub rules: Option<String>,
    /// Price paid, in cents.
    pub pay_value: i64,
    /// Face value, in cents.
    pub actual_value: i64,
    #[serde(rename = "type")]
    #[schema(example = 1)]
    pub kind: u8,
    #[serde(default)]
    pub stock: Option<i32>,
    #[serde(default)]
    #[schema(example = "2026-11-11 20:00:00")]
    pub begin_time: Option<String>,
    #[serde(default)]
    #[schema(example = "2026-11-11 21:00:00")]
    pub end_time: Option<String>,
}

fn seckill_terms(body: &CreateVoucherRequest) -> Result<SeckillTerms, Error> {
    let stock = body.stock.ok_or_else(|| missing_field_error("stock"))?;
    let begin_time = body
        .begin_time
        .as_deref()
        .ok_or_else(|| missing_field_error("beginTime"))?;
    let end_time = body
        .end_time
        .as_deref()
        .ok_or_else(|| missing_field_error("endTime"))?;
    Ok(SeckillTerms {
        stock,
        begin_time: parse_date_time(begin_time, "beginTime")?,
        end_time: parse_date_time(end_time, "endTime")?,
    })
}

impl TryFrom<CreateVoucherRequest> for NewVoucher {
    type Error = Error;

    fn try_from(body: CreateVoucherRequest) -> Result<Self, Self::Error> {
        let shop_id = ShopId::new(require_id(body.shop_id.as_ref(), "shopId")?);
        let kind = VoucherKind::try_from(body.kind).map_err(|err| {
            Error::invalid_request(err.to_string())
                .with_details(json!({ "field": "type", "value": body.kind }))
        })?;
        let seckill = match kind {
            VoucherKind::Seckill => Some(seckill_terms(&body)?),
            VoucherKind::Ordinary => None,
        };
        Ok(Self {
            shop_id,
            title: body.title,
            sub_title: body.sub_title,
            rules: body.rules,
            pay_value: body.pay_value,
            actual_value: body.actual_value,
            kind,
            seckill,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVoucherResponse {
    #[schema(value_type = u64)]
    pub voucher_id: VoucherId,
}

/// Create an ordinary or seckill voucher.
#[utoipa::path(
    post,
    path = "/api/v1/voucher",
    request_body = CreateVoucherRequest,
    responses(
        (status = 200, description = "Voucher created", body = CreateVoucherResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["vouchers"],
    operation_id = "createVoucher"
)]
#[post("/voucher")]
pub async fn create_voucher(
    state: web::Data<HttpState>,
    payload: web::Json<CreateVoucherRequest>,
) -> ApiResult<web::Json<CreateVoucherResponse>> {
    let voucher = NewVoucher::try_from(payload.into_inner())?;
    let voucher_id = state.vouchers.create_voucher(voucher).await?;
    Ok(web::Json(CreateVoucherResponse { voucher_id }))
}

/// Read seckill terms through the read cache.
#[utoipa::path(
    get,
    path = "/api/v1/voucher/seckill/{id}",
    params(("id" = u64, Path, description = "Voucher identifier")),
    responses(
        (status = 200, description = "Seckill terms", body = SeckillVoucherSchema),
        (status = 400, description = "Invalid identifier", body = ErrorSchema),
        (status = 404, description = "Unknown seckill voucher", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema)
    ),
    tags = ["vouchers"],
    operation_id = "getSeckillVoucher"
)]
#[get("/voucher/seckill/{id}")]
pub async fn get_seckill_voucher(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<SeckillVoucher>> {
    let voucher_id = VoucherId::new(parse_path_id(&path, "id")?);
    let voucher = state.vouchers.seckill_voucher(voucher_id).await?;
    Ok(web::Json(voucher))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::json_config;
    use crate::inbound::http::test_utils::MockPorts;
    use actix_http::Request;
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use chrono::{TimeZone, Utc};
    use rstest::{fixture, rstest};
    use serde_json::Value;

    async fn send(ports: MockPorts, request: Request) -> (StatusCode, Value) {
        let app = actix_test::init_service(
            App::new()
                .app_data(ports.into_state())
                .app_data(json_config())
                .service(
                    web::scope("/api/v1")
                        .service(create_voucher)
                        .service(get_seckill_voucher),
                ),
        )
        .await;
        let response = actix_test::call_service(&app, request).await;
        let status = response.status();
        let body: Value = actix_test::read_body_json(response).await;
        (status, body)
    }

    fn post(body: Value) -> Request {
        actix_test::TestRequest::post()
            .uri("/api/v1/voucher")
            .set_json(body)
            .to_request()
    }

    #[fixture]
    fn seckill_body() -> Value {
        json!({
            "shopId": 1,
            "title": "50 off dinner",
            "payValue": 100,
            "actualValue": 5000,
            "type": 1,
            "stock": 100,
            "beginTime": "2026-11-11 20:00:00",
            "endTime": "2026-11-11 21:00:00"
        })
    }

    #[rstest]
    #[actix_web::test]
    async fn seckill_vouchers_carry_parsed_terms(seckill_body: Value) {
        let mut ports = MockPorts::default();
        ports
            .vouchers
            .expect_create_voucher()
            .withf(|voucher| {
                let begin = Utc
                    .with_ymd_and_hms(2026, 11, 11, 20, 0, 0)
                    .single()
                    .expect("valid timestamp");
                voucher.kind == VoucherKind::Seckill
                    && voucher
                        .seckill
                        .as_ref()
                        .is_some_and(|terms| terms.stock == 100 && terms.begin_time == begin)
            })
            .times(1)
            .returning(|_| Ok(VoucherId::new(7)));

        let (status, body) = send(ports, post(seckill_body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"voucherId": 7}));
    }

    #[rstest]
    #[actix_web::test]
    async fn ordinary_vouchers_drop_seckill_fields(mut seckill_body: Value) {
        seckill_body["type"] = json!(0);
        let mut ports = MockPorts::default();
        ports
            .vouchers
            .expect_create_voucher()
            .withf(|voucher| voucher.kind == VoucherKind::Ordinary && voucher.seckill.is_none())
            .times(1)
            .returning(|_| Ok(VoucherId::new(8)));

        let (status, _) = send(ports, post(seckill_body)).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[rstest]
    #[case("stock", "stock")]
    #[case("beginTime", "beginTime")]
    #[case("endTime", "endTime")]
    #[actix_web::test]
    async fn seckill_vouchers_require_their_terms(
        mut seckill_body: Value,
        #[case] removed: &str,
        #[case] field: &str,
    ) {
        seckill_body
            .as_object_mut()
            .expect("object body")
            .remove(removed);
        let mut ports = MockPorts::default();
        ports.vouchers.expect_create_voucher().never();

        let (status, body) = send(ports, post(seckill_body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["field"], field);
    }

    #[rstest]
    #[actix_web::test]
    async fn unknown_kinds_are_rejected(mut seckill_body: Value) {
        seckill_body["type"] = json!(4);
        let mut ports = MockPorts::default();
        ports.vouchers.expect_create_voucher().never();

        let (status, body) = send(ports, post(seckill_body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["field"], "type");
    }

    #[rstest]
    #[actix_web::test]
    async fn seckill_terms_are_served_as_camel_case() {
        let begin = Utc
            .with_ymd_and_hms(2026, 11, 11, 20, 0, 0)
            .single()
            .expect("valid timestamp");
        let mut ports = MockPorts::default();
        ports
            .vouchers
            .expect_seckill_voucher()
            .withf(|id| *id == VoucherId::new(7))
            .times(1)
            .returning(move |id| {
                Ok(SeckillVoucher {
                    voucher_id: id,
                    stock: 100,
                    begin_time: begin,
                    end_time: begin + chrono::Duration::hours(1),
                })
            });
        let request = actix_test::TestRequest::get()
            .uri("/api/v1/voucher/seckill/7")
            .to_request();

        let (status, body) = send(ports, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["voucherId"], 7);
        assert_eq!(body["stock"], 100);
    }

    #[rstest]
    #[actix_web::test]
    async fn unknown_seckill_vouchers_are_not_found() {
        let mut ports = MockPorts::default();
        ports
            .vouchers
            .expect_seckill_voucher()
            .times(1)
            .returning(|id| Err(Error::not_found(format!("seckill voucher {id} not found"))));
        let request = actix_test::TestRequest::get()
            .uri("/api/v1/voucher/seckill/404")
            .to_request();

        let (status, body) = send(ports, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[rstest]
    #[actix_web::test]
    async fn non_numeric_path_ids_are_invalid() {
        let mut ports = MockPorts::default();
        ports.vouchers.expect_seckill_voucher().never();
        let request = actix_test::TestRequest::get()
            .uri("/api/v1/voucher/seckill/abc")
            .to_request();

        let (status, _) = send(ports, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
