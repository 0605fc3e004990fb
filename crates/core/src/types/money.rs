//! Monetary amounts in Canadian dollars.
//!
//! Amounts are plain [`Decimal`]s so sums never drift. Rounding to cents
//! happens only when a value leaves the system (JSON responses, payment
//! instructions, stored order totals) via [`round_cents`] and [`format_cad`].

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serializer;

/// Round an amount to cents, half away from zero.
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Render an amount with exactly two decimal places (`150` becomes `"150.00"`).
#[must_use]
pub fn format_cad(amount: Decimal) -> String {
    format!("{:.2}", round_cents(amount))
}

/// Unit price times quantity, or `None` when the product does not fit in a
/// [`Decimal`].
#[must_use]
pub fn checked_line_total(unit_price: Decimal, quantity: u32) -> Option<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity))
}

/// Sum of `amounts`, or `None` on overflow.
#[must_use]
pub fn checked_sum<I: IntoIterator<Item = Decimal>>(amounts: I) -> Option<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, Decimal::checked_add)
}

/// Serde helper that writes an amount as a two-decimal string.
///
/// ```rust,ignore
/// #[derive(Serialize)]
/// struct Totals {
///     #[serde(serialize_with = "money::serialize")]
///     total: Decimal,
/// }
/// ```
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize<S: Serializer>(amount: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_cad(*amount))
}

/// Serde helper for optional amounts.
///
/// # Errors
///
/// Propagates serializer errors.
#[allow(clippy::ref_option)]
pub fn serialize_option<S: Serializer>(
    amount: &Option<Decimal>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match amount {
        Some(amount) => serializer.serialize_some(&format_cad(*amount)),
        None => serializer.serialize_none(),
    }
}
