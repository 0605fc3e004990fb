//! Public catalog routes.
//!
//! Products are returned in their public form; cost, margin and sourcing
//! fields never leave the server.

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use protocol_zero_core::catalog::{AddonOffer, PublicProduct, addon_offers};
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Shared cache policy for catalog responses.
const PRODUCTS_CACHE_CONTROL: &str = "public, s-maxage=120, stale-while-revalidate=300";
const ADDONS_CACHE_CONTROL: &str = "public, s-maxage=60, stale-while-revalidate=120";

fn cached_json<T: Serialize>(body: &T, policy: &'static str) -> Response {
    (
        [(header::CACHE_CONTROL, HeaderValue::from_static(policy))],
        Json(body),
    )
        .into_response()
}

/// List active products.
///
/// GET /api/products
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Response> {
    let products = state.catalog().list_products().await?;
    let public: Vec<PublicProduct> = products.iter().map(|p| p.to_public()).collect();
    debug!(count = public.len(), "Listed products");
    Ok(cached_json(&public, PRODUCTS_CACHE_CONTROL))
}

/// A single product by product ID, SKU or record id.
///
/// GET /api/products/{id}
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let product = state
        .catalog()
        .get_product(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    Ok(cached_json(&product.to_public(), PRODUCTS_CACHE_CONTROL))
}

/// Add-on listing body.
#[derive(Debug, Serialize)]
pub struct AddonsResponse {
    pub items: Vec<AddonOffer>,
    pub count: usize,
}

/// Whether the request was made from one of the storefront's own pages.
///
/// Checks `Origin`, then the origin of `Referer`.
fn from_allowed_origin(headers: &HeaderMap, allowed: &[String]) -> bool {
    let is_allowed = |origin: &str| allowed.iter().any(|a| a == origin);

    if let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok())
        && is_allowed(origin)
    {
        return true;
    }

    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|referer| Url::parse(referer).ok())
        .is_some_and(|url| is_allowed(&url.origin().ascii_serialization()))
}

/// Variants currently sold at add-on prices, best savings first.
///
/// GET /api/addons
///
/// Only answers requests coming from the storefront itself.
#[instrument(skip(state, headers))]
pub async fn addons(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    if !from_allowed_origin(&headers, &state.config().store.allowed_origins) {
        return Err(AppError::Forbidden("Forbidden".to_string()));
    }

    let products = state.catalog().list_products().await?;
    let items = addon_offers(&products);
    let body = AddonsResponse {
        count: items.len(),
        items,
    };
    Ok(cached_json(&body, ADDONS_CACHE_CONTROL))
}
