//! Shop catalogue records served through the read cache.

use serde::{Deserialize, Serialize};

use super::ShopId;

/// A shop listing.
///
/// Serialised as camelCase JSON both in cache entries and in HTTP responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    /// Store-assigned identifier.
    pub id: ShopId,
    /// Display name.
    pub name: String,
    /// Shop type the shop is listed under.
    pub type_id: u64,
    /// Comma-separated image URLs.
    pub images: String,
    /// Neighbourhood, when known.
    pub area: Option<String>,
    /// Street address.
    pub address: String,
    /// Average spend per visit, in cents.
    pub avg_price: Option<i64>,
    /// Vouchers sold so far.
    pub sold: i32,
    /// Review count.
    pub comments: i32,
    /// Rating in tenths of a star (0..=50).
    pub score: i32,
    /// Opening hours as free text.
    pub open_hours: Option<String>,
}

/// Shop fields supplied on creation; the store assigns the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopDraft {
    /// Display name.
    pub name: String,
    /// Shop type the shop is listed under.
    pub type_id: u64,
    /// Comma-separated image URLs.
    pub images: String,
    /// Neighbourhood, when known.
    pub area: Option<String>,
    /// Street address.
    pub address: String,
    /// Average spend per visit, in cents.
    pub avg_price: Option<i64>,
    /// Rating in tenths of a star (0..=50).
    pub score: i32,
    /// Opening hours as free text.
    pub open_hours: Option<String>,
}

impl ShopDraft {
    /// Attach the identifier allocated by the store.
    pub fn into_shop(self, id: ShopId) -> Shop {
        Shop {
            id,
            name: self.name,
            type_id: self.type_id,
            images: self.images,
            area: self.area,
            address: self.address,
            avg_price: self.avg_price,
            sold: 0,
            comments: 0,
            score: self.score,
            open_hours: self.open_hours,
        }
    }
}

/// A shop category, listed in ascending `sort` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopType {
    /// Type identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Icon path.
    pub icon: String,
    /// Position in listings, ascending.
    pub sort: i32,
}

/// Validation failures for shop writes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShopValidationError {
    #[error("shop name must not be empty")]
    EmptyName,
    #[error("shop address must not be empty")]
    EmptyAddress,
    #[error("shop score must be between 0 and 50")]
    ScoreOutOfRange,
}

fn validate_fields(name: &str, address: &str, score: i32) -> Result<(), ShopValidationError> {
    if name.trim().is_empty() {
        return Err(ShopValidationError::EmptyName);
    }
    if address.trim().is_empty() {
        return Err(ShopValidationError::EmptyAddress);
    }
    if !(0..=50).contains(&score) {
        return Err(ShopValidationError::ScoreOutOfRange);
    }
    Ok(())
}

impl ShopDraft {
    /// Check required fields.
    pub fn validate(&self) -> Result<(), ShopValidationError> {
        validate_fields(&self.name, &self.address, self.score)
    }
}

impl Shop {
    /// Check required fields.
    pub fn validate(&self) -> Result<(), ShopValidationError> {
        validate_fields(&self.name, &self.address, self.score)
    }
}
