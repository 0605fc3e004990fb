//! Fixed in-memory catalog for tests.

use async_trait::async_trait;
use protocol_zero_core::catalog::Product;
use tokio::sync::RwLock;

use super::CatalogRepository;
use crate::repository::Result;

#[derive(Default)]
pub struct MemoryCatalog {
    products: RwLock<Vec<Product>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: RwLock::new(products),
        }
    }

    /// Replace the catalog contents.
    pub async fn set(&self, products: Vec<Product>) {
        *self.products.write().await = products;
    }
}

#[async_trait]
impl CatalogRepository for MemoryCatalog {
    async fn list_products(&self) -> Result<Vec<Product>> {
        let products = self.products.read().await;
        Ok(products.iter().filter(|p| p.is_active()).cloned().collect())
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>> {
        let products = self.products.read().await;
        Ok(products
            .iter()
            .find(|p| p.id.as_str() == id || p.sku == id || p.record_id == id)
            .cloned())
    }
}
