//! Driving port for the cached shop catalogue.
use async_trait::async_trait;

use crate::domain::{Error, Shop, ShopDraft, ShopId, ShopType};

/// Driving port for shop reads and writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShopCatalogue: Send + Sync {
    async fn shop(&self, id: ShopId) -> Result<Shop, Error>;

    async fn create_shop(&self, draft: ShopDraft) -> Result<ShopId, Error>;

    /// Write through to the store, then invalidate the cached entry.
    async fn update_shop(&self, shop: Shop) -> Result<(), Error>;

    /// Delete from the store, then invalidate the cached entry.
    async fn delete_shop(&self, id: ShopId) -> Result<(), Error>;

    async fn shop_types(&self) -> Result<Vec<ShopType>, Error>;
}
