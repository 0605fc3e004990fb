//! Read-through cache in front of a catalog backend.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use protocol_zero_core::catalog::Product;
use tracing::debug;

use super::CatalogRepository;
use crate::repository::Result;

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
    Product(String),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Vec<Product>),
    /// `None` caches a miss so unknown ids do not hit the backend each time.
    Product(Option<Box<Product>>),
}

/// Wraps a [`CatalogRepository`] with a TTL cache.
///
/// Errors are never cached.
pub struct CachedCatalog<R> {
    inner: R,
    cache: Cache<CacheKey, CacheValue>,
}

impl<R: CatalogRepository> CachedCatalog<R> {
    #[must_use]
    pub fn new(inner: R, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();
        Self { inner, cache }
    }
}

#[async_trait]
impl<R: CatalogRepository> CatalogRepository for CachedCatalog<R> {
    async fn list_products(&self) -> Result<Vec<Product>> {
        if let Some(CacheValue::Products(products)) = self.cache.get(&CacheKey::Products).await {
            debug!("Catalog cache hit");
            return Ok(products);
        }

        let products = self.inner.list_products().await?;
        self.cache
            .insert(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>> {
        let key = CacheKey::Product(id.to_string());
        if let Some(CacheValue::Product(product)) = self.cache.get(&key).await {
            debug!(id, "Product cache hit");
            return Ok(product.map(|p| *p));
        }

        let product = self.inner.get_product(id).await?;
        self.cache
            .insert(key, CacheValue::Product(product.clone().map(Box::new)))
            .await;
        Ok(product)
    }

    async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        self.inner.invalidate().await;
        debug!("Catalog cache invalidated");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::catalog::memory::MemoryCatalog;

    struct Counting {
        inner: MemoryCatalog,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CatalogRepository for Counting {
        async fn list_products(&self) -> Result<Vec<Product>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list_products().await
        }

        async fn get_product(&self, id: &str) -> Result<Option<Product>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_product(id).await
        }
    }

    fn cached() -> (CachedCatalog<Counting>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let inner = Counting {
            inner: MemoryCatalog::new(Vec::new()),
            calls: Arc::clone(&calls),
        };
        (CachedCatalog::new(inner, Duration::from_secs(60)), calls)
    }

    #[tokio::test]
    async fn test_second_read_is_served_from_cache() {
        let (catalog, calls) = cached();
        catalog.list_products().await.unwrap();
        catalog.list_products().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_misses_are_cached_per_id() {
        let (catalog, calls) = cached();
        assert!(catalog.get_product("PZ-404").await.unwrap().is_none());
        assert!(catalog.get_product("PZ-404").await.unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let (catalog, calls) = cached();
        catalog.list_products().await.unwrap();
        catalog.invalidate().await;
        catalog.list_products().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
