//! End-to-end tests for the Protocol Zero storefront API.
//!
//! Requests go through the full router and middleware stack with
//! `tower::ServiceExt::oneshot`; the record store is replaced by the
//! in-memory repositories, so no network or credentials are needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p protocol-zero-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `catalog` - Product listing, add-on offers, cache revalidation
//! - `cart` - Cart quotes and promo codes
//! - `checkout` - Order placement and bot screening
//! - `admin_orders` - Admin authorization and the order lifecycle
//! - `rate_limit` - Per-IP budgets and their error bodies

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use protocol_zero_core::catalog::Product;
use protocol_zero_core::promo::PromoCode;
use protocol_zero_storefront::catalog::cache::CachedCatalog;
use protocol_zero_storefront::catalog::memory::MemoryCatalog;
use protocol_zero_storefront::config::StorefrontConfig;
use protocol_zero_storefront::middleware::EmailAllowList;
use protocol_zero_storefront::repository::memory::{MemoryOrders, MemoryPromos, MemoryUsers};
use protocol_zero_storefront::routes;
use protocol_zero_storefront::state::{AppState, Backends};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@pzairsoft.ca";
pub const ADMIN_UID: &str = "uid_admin";
pub const REVALIDATE_TOKEN: &str = "Zq7vR2kXp9LmT4wN8cYb";
pub const SHOP_ORIGIN: &str = "https://pzairsoft.ca";
pub const PAYEE_EMAIL: &str = "payments@pzairsoft.ca";
/// TCP peer every request appears to come from.
pub const PEER_ADDR: &str = "192.0.2.10:51000";

/// Environment every test app starts from.
const BASE_VARS: &[(&str, &str)] = &[
    ("RATE_LIMIT_ENABLED", "false"),
    ("ADMIN_EMAILS", ADMIN_EMAIL),
    ("REVALIDATE_TOKEN", REVALIDATE_TOKEN),
    ("ALLOWED_ORIGINS", SHOP_ORIGIN),
    ("ADDON_THRESHOLD", "100"),
    ("STORE_PAYEE_EMAIL", PAYEE_EMAIL),
    ("CATALOG_CACHE_TTL_SECONDS", "300"),
];

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// JSON body; plain text bodies become a JSON string, empty ones `null`.
    pub body: Value,
}

impl TestResponse {
    /// `error` message of an error body.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// The storefront wired to in-memory backends.
pub struct TestApp {
    router: Router,
    pub orders: Arc<MemoryOrders>,
    pub users: Arc<MemoryUsers>,
    /// The backing catalog, behind the same read cache production uses.
    pub catalog: Arc<MemoryCatalog>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::with_vars(&[])
    }

    /// Build with extra or replaced variables. An empty value unsets one.
    ///
    /// # Panics
    ///
    /// Panics if the resulting configuration is invalid.
    #[must_use]
    pub fn with_vars(overrides: &[(&str, &str)]) -> Self {
        let vars: HashMap<String, String> = BASE_VARS
            .iter()
            .chain(overrides)
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let config = StorefrontConfig::from_lookup(&|key| vars.get(key).cloned())
            .expect("test configuration should load");

        let orders = Arc::new(MemoryOrders::new());
        let users = Arc::new(MemoryUsers::new());
        let catalog = Arc::new(MemoryCatalog::new(products()));

        let backends = Backends {
            catalog: Arc::new(CachedCatalog::new(
                Arc::clone(&catalog),
                Duration::from_secs(300),
            )),
            orders: orders.clone(),
            users: users.clone(),
            promos: Arc::new(MemoryPromos::new(promo_codes())),
            admin_policy: Arc::new(EmailAllowList::new(&config.store.admin_emails)),
        };

        Self {
            router: routes::app(AppState::with_backends(config, backends)),
            orders,
            users,
            catalog,
        }
    }

    /// Send a request through the full middleware stack.
    ///
    /// The request carries [`PEER_ADDR`] as its connection info, as the
    /// server binary attaches it.
    ///
    /// # Panics
    ///
    /// Panics if the router fails or the body cannot be read.
    pub async fn send(&self, mut request: Request<Body>) -> TestResponse {
        if request.extensions().get::<ConnectInfo<SocketAddr>>().is_none() {
            let peer: SocketAddr = PEER_ADDR.parse().expect("peer address should parse");
            request.extensions_mut().insert(ConnectInfo(peer));
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Send with extra headers and an optional JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<&Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("request should build"))
            .await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, &[], None).await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.request(Method::POST, uri, &[], Some(body)).await
    }

    pub async fn admin_get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, &admin_headers(ADMIN_EMAIL), None)
            .await
    }

    pub async fn admin_patch(&self, uri: &str, body: &Value) -> TestResponse {
        self.request(Method::PATCH, uri, &admin_headers(ADMIN_EMAIL), Some(body))
            .await
    }

    /// Check out [`checkout_body`] and return the response body.
    ///
    /// # Panics
    ///
    /// Panics unless the order is placed.
    pub async fn place_order(&self) -> Value {
        let response = self.post_json("/api/checkout", &checkout_body()).await;
        assert_eq!(response.status, StatusCode::OK, "checkout failed: {:?}", response.body);
        response.body
    }
}

/// Headers the auth proxy forwards for a signed-in user.
#[must_use]
pub fn admin_headers(email: &str) -> [(&str, &str); 3] {
    [
        ("authorization", "Bearer id-token"),
        ("x-user-email", email),
        ("x-user-id", ADMIN_UID),
    ]
}

/// A valid checkout: two lines totalling `150.00`.
#[must_use]
pub fn checkout_body() -> Value {
    json!({
        "email": "shopper@pzairsoft.ca",
        "displayName": "Sam Shooter",
        "phone": "604-555-0100",
        "items": [
            {
                "productId": "PZ-VEST",
                "productTitle": "Tactical Vest",
                "variantId": "vest-black",
                "variantTitle": "Black",
                "quantity": 1,
                "unitPriceCad": "80.00",
                "itemType": "regular"
            },
            {
                "productId": "PZ-MAG",
                "productTitle": "Mag Pouch",
                "variantId": "mag-1",
                "quantity": 2,
                "unitPriceCad": "35.00",
                "itemType": "regular"
            }
        ],
        "subtotalCad": "150.00",
        "shippingCad": "0",
        "totalCad": "150.00"
    })
}

/// A cart line as the shopper's browser holds it.
#[must_use]
pub fn cart_item(variant_id: &str, regular_price: &str, quantity: u32) -> Value {
    json!({
        "productId": format!("P-{variant_id}"),
        "productTitle": format!("Product {variant_id}"),
        "variantId": variant_id,
        "variantTitle": "Default",
        "regularPrice": regular_price,
        "quantity": quantity,
        "itemType": "regular"
    })
}

/// An add-on line with its discounted price.
#[must_use]
pub fn addon_item(variant_id: &str, regular_price: &str, addon_price: &str) -> Value {
    json!({
        "productId": format!("P-{variant_id}"),
        "productTitle": format!("Product {variant_id}"),
        "variantId": variant_id,
        "variantTitle": "Default",
        "regularPrice": regular_price,
        "addonPrice": addon_price,
        "isAddonEligible": true,
        "quantity": 1,
        "itemType": "addon"
    })
}

fn product(value: Value) -> Product {
    serde_json::from_value(value).expect("fixture product should deserialize")
}

/// Catalog fixture: one regular product, two add-on candidates and one
/// inactive product.
#[must_use]
pub fn products() -> Vec<Product> {
    vec![
        product(json!({
            "id": "PZ-VEST",
            "recordId": "rec_p1",
            "sku": "SKU-VEST",
            "title": "Tactical Vest",
            "titleOriginal": "战术背心",
            "margin": "0.5",
            "primaryImage": "/images/vest.jpg",
            "images": ["/images/vest.jpg"],
            "status": "Active",
            "sourceUrl": "https://item.taobao.com/item.htm?id=1",
            "variants": [
                { "id": "vest-black", "title": "Black", "cnyPrice": "150", "priceCad": "80" }
            ]
        })),
        product(json!({
            "id": "PZ-MAG",
            "recordId": "rec_p2",
            "sku": "SKU-MAG",
            "title": "Mag Pouch",
            "margin": "0.5",
            "primaryImage": "/images/mag.jpg",
            "images": ["/images/mag.jpg"],
            "status": "Active",
            "variants": [{
                "id": "mag-1",
                "title": "Single",
                "cnyPrice": "30",
                "priceCad": "20",
                "isAddonEligible": true,
                "addonPriceCad": "15",
                "addonCostCad": "10",
                "addonMargin": "40"
            }]
        })),
        product(json!({
            "id": "PZ-PATCH",
            "recordId": "rec_p3",
            "sku": "SKU-PATCH",
            "title": "Morale Patch",
            "margin": "0.5",
            "primaryImage": "/images/patch.jpg",
            "images": ["/images/patch.jpg"],
            "status": "Active",
            "variants": [{
                "id": "patch-1",
                "title": "Default",
                "cnyPrice": "8",
                "priceCad": "10",
                "isAddonEligible": true,
                "addonPriceCad": "5",
                "addonCostCad": "3"
            }]
        })),
        product(json!({
            "id": "PZ-OLD",
            "recordId": "rec_p4",
            "sku": "SKU-OLD",
            "title": "Discontinued Holster",
            "margin": "0.5",
            "primaryImage": "/images/holster.jpg",
            "images": [],
            "status": "Inactive",
            "variants": []
        })),
    ]
}

/// `PJAD` (10%, active) and `OLDIE` (15%, inactive).
#[must_use]
pub fn promo_codes() -> Vec<PromoCode> {
    vec![
        PromoCode {
            code: "PJAD".to_string(),
            active: true,
            discount_percent: Decimal::TEN,
        },
        PromoCode {
            code: "OLDIE".to_string(),
            active: false,
            discount_percent: Decimal::from(15),
        },
    ]
}
