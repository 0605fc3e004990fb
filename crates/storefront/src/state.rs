//! Application state shared across handlers.

use std::sync::Arc;

use crate::catalog::CatalogRepository;
use crate::catalog::cache::CachedCatalog;
use crate::catalog::knack::KnackCatalog;
use crate::catalog::notion::NotionCatalog;
use crate::config::{CatalogBackend, StorefrontConfig};
use crate::knack::KnackClient;
use crate::middleware::auth::{AdminPolicy, EmailAllowList};
use crate::notion::NotionClient;
use crate::repository::knack::{KnackOrders, KnackPromos, KnackUsers};
use crate::repository::{OrderRepository, PromoRepository, UserDirectory};

/// The storage and policy implementations a running service uses.
///
/// Production builds these from configuration in [`AppState::new`]; tests
/// pass in-memory implementations to [`AppState::with_backends`].
#[derive(Clone)]
pub struct Backends {
    pub catalog: Arc<dyn CatalogRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub promos: Arc<dyn PromoRepository>,
    pub admin_policy: Arc<dyn AdminPolicy>,
}

impl Backends {
    /// Vendor-backed implementations selected by `config`.
    ///
    /// The catalog backend is chosen here once and wrapped in the read
    /// cache. Missing vendor credentials are not an error yet; requests that
    /// reach an unconfigured store fail with 503.
    #[must_use]
    pub fn from_config(config: &StorefrontConfig) -> Self {
        let knack = KnackClient::new(&config.knack);
        let notion = NotionClient::new(&config.notion, &config.base_url);
        let ttl = config.catalog.cache_ttl;

        let catalog: Arc<dyn CatalogRepository> = match config.catalog.backend {
            CatalogBackend::Knack => Arc::new(CachedCatalog::new(
                KnackCatalog::new(knack.clone(), notion, &config.knack),
                ttl,
            )),
            CatalogBackend::Notion => Arc::new(CachedCatalog::new(NotionCatalog::new(notion), ttl)),
        };

        Self {
            catalog,
            orders: Arc::new(KnackOrders::new(knack.clone(), &config.knack)),
            users: Arc::new(KnackUsers::new(knack.clone(), &config.knack)),
            promos: Arc::new(KnackPromos::new(knack, &config.knack)),
            admin_policy: Arc::new(EmailAllowList::new(&config.store.admin_emails)),
        }
    }
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backends: Backends,
}

impl AppState {
    /// Create the application state with vendor-backed stores.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let backends = Backends::from_config(&config);
        tracing::info!(backend = ?config.catalog.backend, "Catalog backend selected");
        Self::with_backends(config, backends)
    }

    /// Create the application state around explicit implementations.
    #[must_use]
    pub fn with_backends(config: StorefrontConfig, backends: Backends) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, backends }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogRepository {
        self.inner.backends.catalog.as_ref()
    }

    #[must_use]
    pub fn orders(&self) -> &dyn OrderRepository {
        self.inner.backends.orders.as_ref()
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserDirectory {
        self.inner.backends.users.as_ref()
    }

    #[must_use]
    pub fn promos(&self) -> &dyn PromoRepository {
        self.inner.backends.promos.as_ref()
    }

    /// Who may use the admin surface.
    #[must_use]
    pub fn admin_policy(&self) -> &dyn AdminPolicy {
        self.inner.backends.admin_policy.as_ref()
    }
}
