//! Port for relational shop catalogue persistence.
use async_trait::async_trait;

use crate::domain::{Shop, ShopDraft, ShopId, ShopType};

use super::define_port_error;

define_port_error! {
    /// Errors raised by shop repository adapters.
    pub enum ShopRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "shop repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "shop repository query failed: {message}",
    }
}

/// Relational access to shops and shop types.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShopRepository: Send + Sync {
    async fn find_by_id(&self, id: ShopId) -> Result<Option<Shop>, ShopRepositoryError>;

    async fn create(&self, draft: &ShopDraft) -> Result<ShopId, ShopRepositoryError>;

    /// Overwrite an existing shop. Returns `false` when no row matched.
    async fn update(&self, shop: &Shop) -> Result<bool, ShopRepositoryError>;

    /// Returns `false` when no row matched.
    async fn delete(&self, id: ShopId) -> Result<bool, ShopRepositoryError>;

    /// All shop types in ascending `sort` order.
    async fn list_types(&self) -> Result<Vec<ShopType>, ShopRepositoryError>;
}
