//! Server-side cart quote.
//!
//! The cart itself lives in the shopper's browser. This endpoint runs the
//! same pricing engine over a submitted snapshot so the client and checkout
//! never disagree on a total.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use protocol_zero_core::cart::{Cart, CartItem, CartTotals, MAX_LINE_QUANTITY};
use protocol_zero_core::promo::PromoValidation;
use protocol_zero_core::types::money;
use protocol_zero_core::{ItemType, VariantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use super::promo::check_code;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Upper bound on distinct lines in a quoted cart.
const MAX_LINES: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub promo_code: Option<String>,
}

/// Price actually charged for one line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLine {
    pub variant_id: VariantId,
    pub quantity: u32,
    pub item_type: ItemType,
    #[serde(serialize_with = "money::serialize")]
    pub unit_price: Decimal,
    #[serde(serialize_with = "money::serialize")]
    pub line_total: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    #[serde(flatten)]
    pub totals: CartTotals,
    pub lines: Vec<QuoteLine>,
    /// Outcome of the submitted promo code, if one was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_result: Option<PromoValidation>,
}

fn invalid_items() -> AppError {
    AppError::Validation("Invalid cart items".to_string())
}

/// Quote a cart snapshot.
///
/// POST /api/cart/quote
///
/// Lines above the per-variant quantity limit, prices outside
/// `0..=MAX_ORDER_TOTAL`, and carts whose sums overflow are rejected
/// with 400.
#[instrument(skip_all)]
pub async fn quote(
    State(state): State<AppState>,
    body: std::result::Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<QuoteResponse>> {
    let Json(request) = body.map_err(|_| AppError::BadRequest("Invalid JSON body".to_string()))?;

    if request.items.len() > MAX_LINES {
        return Err(AppError::Validation("Too many items in cart".to_string()));
    }
    if !request.items.iter().all(|item| item.snapshot.prices_in_range()) {
        return Err(invalid_items());
    }

    let mut cart = Cart::from_items(state.config().store.addon_threshold, request.items);
    if cart.items().iter().any(|item| item.quantity > MAX_LINE_QUANTITY) {
        return Err(invalid_items());
    }

    let promo_result = match request.promo_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => {
            let validation = check_code(&state, Some(code)).await?;
            cart.apply_promo_code(&validation);
            Some(validation)
        }
        _ => None,
    };

    let lines = cart
        .items()
        .iter()
        .map(|item| {
            Some(QuoteLine {
                variant_id: item.variant_id().clone(),
                quantity: item.quantity,
                item_type: item.item_type,
                unit_price: cart.item_price(item),
                line_total: cart.line_total(item)?,
            })
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(invalid_items)?;

    let totals = cart.totals().map_err(|err| {
        warn!(error = %err, "Rejected cart quote");
        invalid_items()
    })?;

    Ok(Json(QuoteResponse {
        totals,
        lines,
        promo_result,
    }))
}
