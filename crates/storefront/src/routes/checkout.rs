//! Checkout: turn a submitted cart into a `placed` order.
//!
//! Flow:
//! 1. Bot screening (honeypot fields, minimum fill time). Tripped checks get
//!    a success-shaped decoy and nothing is stored.
//! 2. Input validation and tag stripping.
//! 3. Buyer resolution: by auth uid, then by email, else a new record.
//! 4. Order number generation and order creation.
//! 5. Interac e-Transfer payment instructions.

use std::sync::LazyLock;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chrono::{DateTime, Utc};
use protocol_zero_core::cart::{MAX_LINE_QUANTITY, MAX_ORDER_TOTAL};
use protocol_zero_core::order::{NewOrder, OrderItem, OrderNumber};
use protocol_zero_core::types::money;
use protocol_zero_core::{Email, ItemType, PaymentMethod, ProductId, VariantId};
use rand::{Rng, distr::Alphanumeric};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::repository::{NewUser, UserRecord};
use crate::state::AppState;

/// Form fields hidden from humans; bots fill them in.
const HONEYPOT_FIELDS: [&str; 4] = ["website", "url", "company", "fax"];

/// Fastest plausible human submission after the form loads.
const MIN_SUBMISSION_TIME_MS: i64 = 3000;

/// How many recent order numbers are scanned for today's sequence.
const ORDER_NUMBER_SCAN: u32 = 100;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid regex"));

/// Remove anything that looks like an HTML tag, then trim.
fn strip_tags(input: &str) -> String {
    TAG_RE.replace_all(input, "").trim().to_string()
}

// =============================================================================
// Request / Response
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    #[serde(default)]
    pub variant_id: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub product_title: String,
    #[serde(default)]
    pub variant_title: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub unit_price_cad: Decimal,
    #[serde(default)]
    pub item_type: ItemType,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Auth provider uid; absent for guest checkout.
    #[serde(default)]
    pub firebase_uid: Option<String>,
    #[serde(default)]
    pub is_guest: bool,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
    #[serde(default)]
    pub subtotal_cad: Decimal,
    #[serde(default)]
    pub shipping_cad: Decimal,
    #[serde(default)]
    pub total_cad: Decimal,

    /// Epoch millis when the checkout form was rendered.
    #[serde(default, rename = "_formLoadTime")]
    pub form_load_time: Option<i64>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub fax: Option<String>,
}

impl CheckoutRequest {
    fn honeypot(&self, field: &str) -> Option<&str> {
        match field {
            "website" => self.website.as_deref(),
            "url" => self.url.as_deref(),
            "company" => self.company.as_deref(),
            "fax" => self.fax.as_deref(),
            _ => None,
        }
    }

    /// Why the submission looks automated, if it does.
    fn bot_signal(&self, now: DateTime<Utc>) -> Option<&'static str> {
        if HONEYPOT_FIELDS
            .iter()
            .any(|field| self.honeypot(field).is_some_and(|v| !v.trim().is_empty()))
        {
            return Some("honeypot");
        }
        match self.form_load_time {
            Some(loaded) if loaded > 0 && now.timestamp_millis() - loaded < MIN_SUBMISSION_TIME_MS => {
                Some("timing")
            }
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstructions {
    pub method: &'static str,
    pub email: String,
    #[serde(serialize_with = "money::serialize")]
    pub amount: Decimal,
    pub reference: String,
    pub instructions: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub success: bool,
    pub order_id: String,
    pub order_number: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firebase_uid: Option<String>,
    pub is_new_user: bool,
    pub message: &'static str,
    pub payment: PaymentInstructions,
}

/// Answer given to suspected bots.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoyResponse {
    pub success: bool,
    pub order_id: &'static str,
    pub message: &'static str,
}

impl DecoyResponse {
    const fn new() -> Self {
        Self {
            success: true,
            order_id: "processing",
            message: "Order received",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CheckoutOutcome {
    Placed(Box<CheckoutResponse>),
    Decoy(DecoyResponse),
}

// =============================================================================
// Validation
// =============================================================================

/// A checkout request that passed validation.
#[derive(Debug)]
struct ValidCheckout {
    email: Email,
    display_name: String,
    name: Option<String>,
    phone: Option<String>,
    items: Vec<OrderItem>,
    subtotal: Decimal,
    total: Decimal,
}

fn invalid(message: &str) -> AppError {
    AppError::Validation(message.to_string())
}

fn validate(request: &CheckoutRequest) -> Result<ValidCheckout> {
    let email = Email::parse(request.email.trim()).map_err(|_| invalid("Valid email is required"))?;

    let display_name = strip_tags(&request.display_name);
    if !(2..=100).contains(&display_name.chars().count()) {
        return Err(invalid("Display name must be 2-100 characters"));
    }

    if request.items.is_empty() {
        return Err(invalid("Order must have at least one item"));
    }

    let mut items = Vec::with_capacity(request.items.len());
    for item in &request.items {
        let quantity = u32::try_from(item.quantity)
            .ok()
            .filter(|q| (1..=MAX_LINE_QUANTITY).contains(q));
        let Some(quantity) = quantity else {
            return Err(invalid("Invalid order items"));
        };
        if item.variant_id.trim().is_empty()
            || item.product_id.trim().is_empty()
            || item.unit_price_cad.is_sign_negative()
            || item.unit_price_cad > MAX_ORDER_TOTAL
        {
            return Err(invalid("Invalid order items"));
        }
        items.push(OrderItem {
            product_id: ProductId::new(item.product_id.trim()),
            variant_id: VariantId::new(item.variant_id.trim()),
            title: strip_tags(&item.product_title),
            variant_title: item.variant_title.as_deref().map(strip_tags),
            sku: item.sku.clone().filter(|s| !s.trim().is_empty()),
            quantity,
            unit_price_cad: item.unit_price_cad,
            item_type: item.item_type,
        });
    }

    let subtotal = items
        .iter()
        .map(OrderItem::line_total)
        .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line?))
        .map(money::round_cents)
        .ok_or_else(|| invalid("Invalid order items"))?;
    let total = money::round_cents(request.total_cad);
    if total.is_sign_negative() || total > MAX_ORDER_TOTAL || total > subtotal {
        return Err(invalid("Invalid order total"));
    }

    let clean = |value: &Option<String>| {
        value
            .as_deref()
            .map(strip_tags)
            .filter(|v| !v.is_empty())
    };

    Ok(ValidCheckout {
        email,
        display_name,
        name: clean(&request.name),
        phone: clean(&request.phone),
        items,
        subtotal,
        total,
    })
}

// =============================================================================
// Handler
// =============================================================================

fn guest_uid(now: DateTime<Utc>) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("guest_{}_{}", now.timestamp_millis(), suffix.to_lowercase())
}

/// Find the buyer's record or create one. Returns the record and whether
/// it was created.
async fn resolve_buyer(
    state: &AppState,
    request: &CheckoutRequest,
    checkout: &ValidCheckout,
    now: DateTime<Utc>,
) -> Result<(UserRecord, bool)> {
    let uid = request
        .firebase_uid
        .as_deref()
        .map(str::trim)
        .filter(|uid| !uid.is_empty());

    if let Some(uid) = uid
        && let Some(user) = state.users().find_by_uid(uid).await?
    {
        return Ok((user, false));
    }
    if let Some(user) = state.users().find_by_email(&checkout.email).await? {
        return Ok((user, false));
    }

    let user = state
        .users()
        .create(
            NewUser {
                uid: uid.map_or_else(|| guest_uid(now), String::from),
                email: checkout.email.clone(),
                display_name: checkout.display_name.clone(),
                name: Some(
                    checkout
                        .name
                        .clone()
                        .unwrap_or_else(|| checkout.display_name.clone()),
                ),
                phone: checkout.phone.clone(),
            },
            now,
        )
        .await?;
    info!(user_id = %user.id, guest = request.is_guest || uid.is_none(), "Created buyer record");
    Ok((user, true))
}

/// Next order number for today.
///
/// A failed scan starts the day's sequence afresh rather than failing
/// checkout.
async fn next_order_number(state: &AppState, now: DateTime<Utc>) -> Result<OrderNumber> {
    let recent = match state.orders().recent_order_numbers(ORDER_NUMBER_SCAN).await {
        Ok(numbers) => numbers,
        Err(e) => {
            warn!(error = %e, "Order number scan failed; starting sequence at 1");
            Vec::new()
        }
    };
    OrderNumber::next_for(now.date_naive(), recent.iter().map(String::as_str))
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn payment_instructions(payee: &str, total: Decimal, order_number: &str) -> PaymentInstructions {
    PaymentInstructions {
        method: PaymentMethod::Etransfer.display_label(),
        email: payee.to_string(),
        amount: total,
        reference: order_number.to_string(),
        instructions: format!(
            "Please send ${} CAD via Interac e-Transfer to {payee}. Use order number {order_number} as the memo. Orders not paid within 2 hours may be cancelled.",
            money::format_cad(total)
        ),
    }
}

/// Place an order.
///
/// POST /api/checkout
///
/// # Errors
///
/// 400 with a shopper-facing message for invalid input; 500
/// `Checkout failed. Please try again.` when storage fails.
#[instrument(skip_all)]
pub async fn checkout(
    State(state): State<AppState>,
    body: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutOutcome>> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let now = Utc::now();

    if let Some(signal) = request.bot_signal(now) {
        warn!(signal, "Checkout bot check tripped");
        return Ok(Json(CheckoutOutcome::Decoy(DecoyResponse::new())));
    }

    let checkout = validate(&request)?;

    place(&state, &request, checkout, now)
        .await
        .map(|response| Json(CheckoutOutcome::Placed(Box::new(response))))
        .map_err(|e| {
            if e.status().is_server_error() {
                let event_id = sentry::capture_error(&e);
                tracing::error!(error = %e, sentry_event_id = %event_id, "Checkout failed");
                AppError::CheckoutFailed
            } else {
                e
            }
        })
}

async fn place(
    state: &AppState,
    request: &CheckoutRequest,
    checkout: ValidCheckout,
    now: DateTime<Utc>,
) -> Result<CheckoutResponse> {
    let (buyer, is_new_user) = resolve_buyer(state, request, &checkout, now).await?;
    let order_number = next_order_number(state, now).await?;
    let number = order_number.to_string();
    add_breadcrumb(
        "checkout",
        "Placing order",
        &[("order_number", number.as_str()), ("user_id", buyer.id.as_str())],
    );

    let total = checkout.total;
    let order = state
        .orders()
        .create(
            NewOrder {
                order_number,
                user_id: buyer.id.clone(),
                user_email: Some(checkout.email.into_inner()),
                customer_name: checkout.name.or(Some(checkout.display_name)),
                customer_phone: checkout.phone,
                items: checkout.items,
                subtotal_cad: checkout.subtotal,
                shipping_cad: Decimal::ZERO,
                total_cad: total,
            },
            now,
        )
        .await?;

    let order_number = order.order_number.to_string();
    info!(order_id = %order.id, order_number = %order_number, total = %total, "Order placed");

    Ok(CheckoutResponse {
        success: true,
        order_id: order.id.to_string(),
        payment: payment_instructions(&state.config().store.payee_email, total, &order_number),
        order_number,
        user_id: buyer.id.to_string(),
        firebase_uid: request.firebase_uid.clone(),
        is_new_user,
        message: if is_new_user {
            "Account created and order placed successfully!"
        } else {
            "Order placed successfully!"
        },
    })
}
