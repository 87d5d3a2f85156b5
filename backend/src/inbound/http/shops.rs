//! Shop catalogue endpoints, served through the read cache.
//!
//! ```text
//! GET /api/v1/shop/1
//! POST /api/v1/shop {"name":"Noodle Bar","typeId":1,"images":"","address":"1 Quay Street","score":45}
//! PUT /api/v1/shop {"id":1,...}
//! DELETE /api/v1/shop/1
//! GET /api/v1/shop-type/list
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, Shop, ShopDraft, ShopId, ShopType};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ErrorSchema, ShopSchema, ShopTypeSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{IdInput, parse_path_id, require_id};

/// Shop fields accepted on create and update.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShopFields {
    pub name: String,
    pub type_id: u64,
    #[serde(default)]
    pub images: String,
    #[serde(default)]
    pub area: Option<String>,
    pub address: String,
    #[serde(default)]
    pub avg_price: Option<i64>,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub open_hours: Option<String>,
}

impl From<ShopFields> for ShopDraft {
    fn from(fields: ShopFields) -> Self {
        Self {
            name: fields.name,
            type_id: fields.type_id,
            images: fields.images,
            area: fields.area,
            address: fields.address,
            avg_price: fields.avg_price,
            score: fields.score,
            open_hours: fields.open_hours,
        }
    }
}

/// Full shop replacement for `PUT /shop`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShopRequest {
    #[serde(default)]
    #[schema(value_type = u64)]
    pub id: Option<IdInput>,
    #[serde(default)]
    pub sold: i32,
    #[serde(default)]
    pub comments: i32,
    #[serde(flatten)]
    pub fields: ShopFields,
}

impl TryFrom<UpdateShopRequest> for Shop {
    type Error = Error;

    fn try_from(body: UpdateShopRequest) -> Result<Self, Self::Error> {
        let id = ShopId::new(require_id(body.id.as_ref(), "id")?);
        let mut shop = ShopDraft::from(body.fields).into_shop(id);
        shop.sold = body.sold;
        shop.comments = body.comments;
        Ok(shop)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateShopResponse {
    #[schema(value_type = u64)]
    pub shop_id: ShopId,
}

fn shop_id_from_path(raw: &str) -> Result<ShopId, Error> {
    parse_path_id(raw, "id").map(ShopId::new)
}

/// Fetch a shop through the read cache.
#[utoipa::path(
    get,
    path = "/api/v1/shop/{id}",
    params(("id" = u64, Path, description = "Shop identifier")),
    responses(
        (status = 200, description = "Shop", body = ShopSchema),
        (status = 400, description = "Invalid identifier", body = ErrorSchema),
        (status = 404, description = "Unknown shop", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema)
    ),
    tags = ["shops"],
    operation_id = "getShop"
)]
#[get("/shop/{id}")]
pub async fn get_shop(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Shop>> {
    let shop = state.shops.shop(shop_id_from_path(&path)?).await?;
    Ok(web::Json(shop))
}

#[utoipa::path(
    post,
    path = "/api/v1/shop",
    request_body = ShopFields,
    responses(
        (status = 200, description = "Shop created", body = CreateShopResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema)
    ),
    tags = ["shops"],
    operation_id = "createShop"
)]
#[post("/shop")]
pub async fn create_shop(
    state: web::Data<HttpState>,
    payload: web::Json<ShopFields>,
) -> ApiResult<web::Json<CreateShopResponse>> {
    let shop_id = state
        .shops
        .create_shop(ShopDraft::from(payload.into_inner()))
        .await?;
    Ok(web::Json(CreateShopResponse { shop_id }))
}

/// Replace a shop and invalidate its cache entry.
#[utoipa::path(
    put,
    path = "/api/v1/shop",
    request_body = UpdateShopRequest,
    responses(
        (status = 204, description = "Shop updated"),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown shop", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema)
    ),
    tags = ["shops"],
    operation_id = "updateShop"
)]
#[put("/shop")]
pub async fn update_shop(
    state: web::Data<HttpState>,
    payload: web::Json<UpdateShopRequest>,
) -> ApiResult<HttpResponse> {
    let shop = Shop::try_from(payload.into_inner())?;
    state.shops.update_shop(shop).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    delete,
    path = "/api/v1/shop/{id}",
    params(("id" = u64, Path, description = "Shop identifier")),
    responses(
        (status = 204, description = "Shop deleted"),
        (status = 404, description = "Unknown shop", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema)
    ),
    tags = ["shops"],
    operation_id = "deleteShop"
)]
#[delete("/shop/{id}")]
pub async fn delete_shop(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    state.shops.delete_shop(shop_id_from_path(&path)?).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// List shop categories in display order.
#[utoipa::path(
    get,
    path = "/api/v1/shop-type/list",
    responses(
        (status = 200, description = "Shop types", body = [ShopTypeSchema]),
        (status = 503, description = "Store unavailable", body = ErrorSchema)
    ),
    tags = ["shops"],
    operation_id = "listShopTypes"
)]
#[get("/shop-type/list")]
pub async fn list_shop_types(state: web::Data<HttpState>) -> ApiResult<web::Json<Vec<ShopType>>> {
    Ok(web::Json(state.shops.shop_types().await?))
}
