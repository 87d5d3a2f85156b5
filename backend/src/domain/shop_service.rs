//! Shop catalogue service backed by the read cache.
//!
//! Writes go to the relational store first and then invalidate the cached
//! entry, so the next read repopulates it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::{CacheKey, ShopCatalogue, ShopRepository, ShopRepositoryError};
use crate::domain::{Error, ReadCache, Shop, ShopDraft, ShopId, ShopType};

/// Domain service implementing [`ShopCatalogue`].
pub struct ShopService {
    shops: Arc<dyn ShopRepository>,
    cache: Arc<ReadCache>,
}

impl ShopService {
    /// Service reading shops through `cache`.
    pub fn new(shops: Arc<dyn ShopRepository>, cache: Arc<ReadCache>) -> Self {
        Self { shops, cache }
    }
}

fn map_repository_error(error: ShopRepositoryError) -> Error {
    match error {
        ShopRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("shop store unavailable: {message}"))
        }
        ShopRepositoryError::Query { message } => {
            Error::internal(format!("shop store query failed: {message}"))
        }
    }
}

fn shop_not_found(id: ShopId) -> Error {
    Error::not_found(format!("shop {id} not found"))
}

#[async_trait]
impl ShopCatalogue for ShopService {
    async fn shop(&self, id: ShopId) -> Result<Shop, Error> {
        let shops = Arc::clone(&self.shops);
        self.cache
            .get_or_load(&CacheKey::shop(id), move || async move {
                shops.find_by_id(id).await.map_err(map_repository_error)
            })
            .await?
            .ok_or_else(|| shop_not_found(id))
    }

    async fn create_shop(&self, draft: ShopDraft) -> Result<ShopId, Error> {
        draft
            .validate()
            .map_err(|error| Error::invalid_request(error.to_string()))?;
        let id = self
            .shops
            .create(&draft)
            .await
            .map_err(map_repository_error)?;
        // A lookup issued before creation may have cached the sentinel.
        self.cache.invalidate(&CacheKey::shop(id)).await;
        Ok(id)
    }

    async fn update_shop(&self, shop: Shop) -> Result<(), Error> {
        shop.validate()
            .map_err(|error| Error::invalid_request(error.to_string()))?;
        let updated = self
            .shops
            .update(&shop)
            .await
            .map_err(map_repository_error)?;
        if !updated {
            return Err(shop_not_found(shop.id));
        }
        self.cache.invalidate(&CacheKey::shop(shop.id)).await;
        Ok(())
    }

    async fn delete_shop(&self, id: ShopId) -> Result<(), Error> {
        let deleted = self.shops.delete(id).await.map_err(map_repository_error)?;
        if !deleted {
            return Err(shop_not_found(id));
        }
        self.cache.invalidate(&CacheKey::shop(id)).await;
        Ok(())
    }

    async fn shop_types(&self) -> Result<Vec<ShopType>, Error> {
        let shops = Arc::clone(&self.shops);
        self.cache
            .get_or_load_list(&CacheKey::shop_types(), move || async move {
                shops.list_types().await.map_err(map_repository_error)
            })
            .await
    }
}
