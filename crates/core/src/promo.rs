//! Promo codes.
//!
//! Codes are matched case-insensitively and stored upper-cased. The record
//! store keeps the discount as a whole percent; carts work with the fraction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Promo code record as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    pub code: String,
    pub active: bool,
    /// Whole percent, `10` for 10%.
    pub discount_percent: Decimal,
}

/// Result of checking a shopper-entered code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoValidation {
    pub valid: bool,
    pub code: String,
    /// Fraction of the regular subtotal taken off, present only when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,
    pub message: String,
}

/// Trim and upper-case a shopper-entered code.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Judge a code against the record found for it (if any).
///
/// A code is valid only when it exists, is active, and takes off more than
/// 0% and at most 100%.
#[must_use]
pub fn evaluate(code: &str, record: Option<&PromoCode>) -> PromoValidation {
    let code = normalize_code(code);

    let Some(record) = record else {
        return PromoValidation {
            valid: false,
            code,
            discount: None,
            message: "Invalid promo code".to_string(),
        };
    };

    if !record.active {
        return PromoValidation {
            valid: false,
            code,
            discount: None,
            message: "This promo code is no longer active".to_string(),
        };
    }

    if record.discount_percent <= Decimal::ZERO || record.discount_percent > Decimal::ONE_HUNDRED {
        return PromoValidation {
            valid: false,
            code,
            discount: None,
            message: "Invalid promo code".to_string(),
        };
    }

    PromoValidation {
        valid: true,
        code,
        discount: Some(record.discount_percent / Decimal::ONE_HUNDRED),
        message: format!("{}% discount applied", record.discount_percent.normalize()),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn promo(active: bool, percent: Decimal) -> PromoCode {
        PromoCode {
            code: "PJAD".to_string(),
            active,
            discount_percent: percent,
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  pjad "), "PJAD");
    }

    #[test]
    fn test_valid_code() {
        let result = evaluate("pjad", Some(&promo(true, dec!(10))));
        assert!(result.valid);
        assert_eq!(result.code, "PJAD");
        assert_eq!(result.discount, Some(dec!(0.10)));
        assert_eq!(result.message, "10% discount applied");
    }

    #[test]
    fn test_unknown_code() {
        let result = evaluate("nope", None);
        assert!(!result.valid);
        assert_eq!(result.message, "Invalid promo code");
        assert_eq!(result.discount, None);
    }

    #[test]
    fn test_inactive_code() {
        let result = evaluate("PJAD", Some(&promo(false, dec!(10))));
        assert!(!result.valid);
        assert_eq!(result.message, "This promo code is no longer active");
    }

    #[test]
    fn test_zero_discount_is_invalid() {
        assert!(!evaluate("PJAD", Some(&promo(true, dec!(0)))).valid);
    }

    #[test]
    fn test_discount_above_full_price_is_invalid() {
        let result = evaluate("PJAD", Some(&promo(true, dec!(150))));
        assert!(!result.valid);
        assert_eq!(result.discount, None);
        assert_eq!(result.message, "Invalid promo code");

        let full = evaluate("PJAD", Some(&promo(true, dec!(100))));
        assert_eq!(full.discount, Some(Decimal::ONE));
    }
}
