//! Seckill admission endpoint.
//!
//! ```text
//! POST /api/v1/voucher/seckill {"voucherId":7,"userId":"1001"}
//! ```

use actix_web::{post, web};
use serde::{Deserialize, Serialize, Serializer};
use utoipa::ToSchema;

use crate::domain::ports::SeckillRequest;
use crate::domain::{Error, OrderId, UserId, VoucherId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{IdInput, require_id};

/// Buyer request for one unit of a seckill voucher.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeckillRequestBody {
    #[serde(default, alias = "voucher_id")]
    #[schema(value_type = u64, example = 7)]
    pub voucher_id: Option<IdInput>,
    #[serde(default, alias = "user_id")]
    #[schema(value_type = u64, example = 1001)]
    pub user_id: Option<IdInput>,
}

impl TryFrom<SeckillRequestBody> for SeckillRequest {
    type Error = Error;

    fn try_from(body: SeckillRequestBody) -> Result<Self, Self::Error> {
        Ok(Self {
            voucher_id: VoucherId::new(require_id(body.voucher_id.as_ref(), "voucherId")?),
            user_id: UserId::new(require_id(body.user_id.as_ref(), "userId")?),
        })
    }
}

/// Admission receipt. The order row is written asynchronously.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeckillResponse {
    /// Order id as a decimal string; ids exceed the 2^53 integer range of
    /// JSON numbers in JavaScript.
    #[serde(serialize_with = "decimal_string")]
    #[schema(value_type = String, example = "164302381907984385")]
    pub order_id: OrderId,
}

fn decimal_string<S: Serializer>(id: &OrderId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}

/// Claim one unit of a seckill voucher.
#[utoipa::path(
    post,
    path = "/api/v1/voucher/seckill",
    request_body = SeckillRequestBody,
    responses(
        (status = 200, description = "Admitted; order pending", body = SeckillResponse),
        (status = 400, description = "Invalid request or sale window closed", body = ErrorSchema),
        (status = 404, description = "Unknown seckill voucher", body = ErrorSchema),
        (status = 409, description = "Sold out or already claimed", body = ErrorSchema),
        (status = 503, description = "Admission store unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["seckill"],
    operation_id = "seckillVoucher"
)]
#[post("/voucher/seckill")]
pub async fn claim_seckill(
    state: web::Data<HttpState>,
    payload: web::Json<SeckillRequestBody>,
) -> ApiResult<web::Json<SeckillResponse>> {
    let request = SeckillRequest::try_from(payload.into_inner())?;
    let order_id = state.seckill.claim(request).await?;
    Ok(web::Json(SeckillResponse { order_id }))
}
