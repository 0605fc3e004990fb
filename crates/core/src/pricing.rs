//! Cost and margin arithmetic for supplier-priced variants.
//!
//! Supplier prices are in CNY. Landed cost adds a per-item shipping
//! allowance and converts to CAD; margins are net of the salesperson cut.
//! Used by operator tooling to price unprofitable small items as add-ons.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::types::money::round_cents;

/// Calculator constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingConfig {
    /// CAD per CNY.
    pub exchange_rate: Decimal,
    /// Shipping allowance for an item sold on its own, CNY.
    pub standard_shipping_cny: Decimal,
    /// Shipping allowance for an item riding along in a larger parcel, CNY.
    pub addon_shipping_cny: Decimal,
    /// Fraction of revenue paid to the salesperson.
    pub salesperson_cut: Decimal,
    /// Margin the add-on price is solved for.
    pub target_addon_margin: Decimal,
    /// Items costing more than this are never discounted as add-ons, CNY.
    pub max_cny_for_addon: Decimal,
    /// Cart value written alongside each add-on price, CAD.
    pub min_cart_for_addon: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            exchange_rate: Decimal::new(20, 2),
            standard_shipping_cny: Decimal::from(70),
            addon_shipping_cny: Decimal::from(20),
            salesperson_cut: Decimal::new(10, 2),
            target_addon_margin: Decimal::new(50, 2),
            max_cny_for_addon: Decimal::from(60),
            min_cart_for_addon: Decimal::from(30),
        }
    }
}

/// Variant cost data as read from the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantCost {
    pub record_id: String,
    pub name: String,
    pub cny_price: Decimal,
    pub status: Option<String>,
    pub selling_price_cad: Option<Decimal>,
    /// Stored standard margin, as a fraction.
    pub margin_standard: Option<Decimal>,
}

/// Add-on pricing computed for one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonQuote {
    pub record_id: String,
    pub name: String,
    pub cny_price: Decimal,
    /// Landed add-on cost, rounded to cents.
    pub addon_cost_cad: Decimal,
    pub addon_price_cad: Decimal,
    /// Achieved margin, percent to one decimal.
    pub addon_margin_percent: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_status: Option<String>,
}

impl PricingConfig {
    /// Landed cost of an item shipped on its own.
    #[must_use]
    pub fn standard_cost(&self, cny: Decimal) -> Decimal {
        (cny + self.standard_shipping_cny) * self.exchange_rate
    }

    /// Landed cost of an item shipped with other items.
    #[must_use]
    pub fn addon_cost(&self, cny: Decimal) -> Decimal {
        (cny + self.addon_shipping_cny) * self.exchange_rate
    }

    /// Margin of a standalone sale. `-1` when there is no price.
    #[must_use]
    pub fn standard_margin(&self, price_cad: Decimal, cost_cad: Decimal) -> Decimal {
        if price_cad <= Decimal::ZERO {
            return Decimal::NEGATIVE_ONE;
        }
        self.margin(price_cad, cost_cad)
    }

    /// Margin after the salesperson cut. `0` when there is no price.
    #[must_use]
    pub fn margin(&self, price_cad: Decimal, cost_cad: Decimal) -> Decimal {
        if price_cad <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (price_cad * (Decimal::ONE - self.salesperson_cut) - cost_cad) / price_cad
    }

    /// Price that yields `target_margin` on the add-on cost, rounded to cents.
    ///
    /// Returns `None` when margin plus salesperson cut leaves nothing to
    /// divide by.
    #[must_use]
    pub fn addon_price(&self, cny: Decimal, target_margin: Decimal) -> Option<Decimal> {
        let divisor = Decimal::ONE - target_margin - self.salesperson_cut;
        if divisor <= Decimal::ZERO {
            return None;
        }
        Some(round_cents(self.addon_cost(cny) / divisor))
    }

    /// Whether a variant should be offered at add-on pricing.
    ///
    /// Candidates lose money standalone (flagged `Unprofitable` or a
    /// negative stored margin) and are cheap enough to discount.
    #[must_use]
    pub fn is_addon_candidate(&self, variant: &VariantCost) -> bool {
        if variant.cny_price <= Decimal::ZERO || variant.cny_price > self.max_cny_for_addon {
            return false;
        }
        let flagged = variant.status.as_deref() == Some("Unprofitable");
        let losing = variant.margin_standard.unwrap_or_default() < Decimal::ZERO;
        flagged || losing
    }

    /// Add-on pricing for a candidate variant, `None` for anything else.
    #[must_use]
    pub fn quote_addon(&self, variant: &VariantCost) -> Option<AddonQuote> {
        if !self.is_addon_candidate(variant) {
            return None;
        }
        let cost = self.addon_cost(variant.cny_price);
        let price = self.addon_price(variant.cny_price, self.target_addon_margin)?;
        let margin = self.margin(price, cost);

        Some(AddonQuote {
            record_id: variant.record_id.clone(),
            name: variant.name.clone(),
            cny_price: variant.cny_price,
            addon_cost_cad: round_cents(cost),
            addon_price_cad: price,
            addon_margin_percent: (margin * Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero),
            current_status: variant.status.clone(),
        })
    }
}
