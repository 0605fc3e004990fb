//! Product catalog sources.
//!
//! The catalog is read from one backend chosen at startup
//! ([`crate::config::CatalogBackend`]) and wrapped in [`cache::CachedCatalog`].
//! Products come back fully priced with their variants; handlers sanitise
//! them with [`Product::to_public`] before they leave the service.

pub mod cache;
pub mod knack;
pub mod memory;
pub mod notion;

use std::sync::Arc;

use async_trait::async_trait;
use protocol_zero_core::catalog::Product;

use crate::repository::Result;

/// Read access to the catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Active products with their variants.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// One product by product ID, SKU or storage record id.
    async fn get_product(&self, id: &str) -> Result<Option<Product>>;

    /// Drop anything cached so the next read goes to the backend.
    async fn invalidate(&self) {}
}

#[async_trait]
impl<R: CatalogRepository + ?Sized> CatalogRepository for Arc<R> {
    async fn list_products(&self) -> Result<Vec<Product>> {
        (**self).list_products().await
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>> {
        (**self).get_product(id).await
    }

    async fn invalidate(&self) {
        (**self).invalidate().await;
    }
}
