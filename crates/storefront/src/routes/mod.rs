//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET   /health                      - Liveness check
//!
//! # Catalog (~60/min)
//! GET   /api/products                - Public product list
//! GET   /api/products/{id}           - Public product by ID, SKU or record id
//! GET   /api/addons                  - Add-on offers, best savings first
//!
//! # Cart
//! GET   /api/promo/validate?code=    - Promo code check
//! POST  /api/cart/quote              - Price a cart snapshot
//!
//! # Checkout (~5/min)
//! POST  /api/checkout                - Place an order
//!
//! # Cache (~10/min)
//! POST  /api/revalidate              - Clear the catalog cache (bearer token)
//!
//! # Admin (allow-listed)
//! GET   /api/admin/orders            - Order list
//! GET   /api/admin/orders/{id}       - Order detail
//! PATCH /api/admin/orders/{id}       - Apply a lifecycle action
//! ```

pub mod admin_orders;
pub mod cart;
pub mod checkout;
pub mod products;
pub mod promo;
pub mod revalidate;

use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    api_rate_limiter, auth, catalog_rate_limiter, checkout_rate_limiter, request_id_middleware,
    revalidate_rate_limiter, security_headers_middleware,
};
use crate::state::AppState;

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{id}", get(products::show))
        .route("/addons", get(products::addons))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(admin_orders::index))
        .route(
            "/orders/{id}",
            get(admin_orders::show).patch(admin_orders::apply_action),
        )
}

/// Create all `/api` routes.
///
/// With `rate_limit` each route group gets its own per-IP budget.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    let catalog = catalog_routes();
    let checkout = Router::new().route("/checkout", post(checkout::checkout));
    let revalidate = Router::new().route("/revalidate", post(revalidate::revalidate));
    let general = Router::new()
        .route("/promo/validate", get(promo::validate))
        .route("/cart/quote", post(cart::quote))
        .nest("/admin", admin_routes());

    let api = if rate_limit {
        catalog
            .layer(catalog_rate_limiter())
            .merge(checkout.layer(checkout_rate_limiter()))
            .merge(revalidate.layer(revalidate_rate_limiter()))
            .merge(general.layer(api_rate_limiter()))
    } else {
        catalog.merge(checkout).merge(revalidate).merge(general)
    };

    Router::new().nest("/api", api)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(auth::USER_EMAIL_HEADER),
            HeaderName::from_static(auth::USER_ID_HEADER),
        ])
        .max_age(std::time::Duration::from_secs(86_400))
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// The complete application router with its middleware stack.
///
/// Sentry layers are added by the binary, outside this stack.
pub fn app(state: AppState) -> Router {
    let config = state.config();
    let cors = cors_layer(&config.store.allowed_origins);
    let rate_limit = config.rate_limit;

    Router::new()
        .route("/health", get(health))
        .merge(routes(rate_limit))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
