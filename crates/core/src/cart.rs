//! Cart pricing engine.
//!
//! Every total is derived from the current line items on demand; nothing
//! is cached between calls. Amounts accumulate unrounded and are rounded
//! to cents only when serialized.
//!
//! Add-on pricing unlocks once the regular-priced subtotal reaches the
//! configured threshold. Items already flagged `addon` keep the flag when
//! the cart falls back below it, but are charged their regular price until
//! the threshold is met again. Add-on items never count towards the
//! threshold themselves.
//!
//! Prices arrive from the shopper's browser, so every sum and product is
//! checked; a cart whose amounts do not fit in a [`Decimal`] has no totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::promo::PromoValidation;
use crate::types::money;
use crate::types::{ItemType, ProductId, VariantId};

/// Most units of one variant in a single cart line.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Largest amount, CAD, accepted for a unit price or an order total.
pub const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Errors from pricing a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("cart amounts are out of range")]
    AmountOverflow,
}

/// Catalog data captured when an item is added.
///
/// Prices and eligibility are frozen at that moment; later catalog changes
/// do not alter a line already in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnapshot {
    pub product_id: ProductId,
    pub product_title: String,
    #[serde(default)]
    pub product_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub variant_id: VariantId,
    pub variant_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub regular_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addon_price: Option<Decimal>,
    #[serde(default)]
    pub is_addon_eligible: bool,
}

impl ItemSnapshot {
    /// Regular and add-on prices (when set) lie within `0..=MAX_ORDER_TOTAL`.
    #[must_use]
    pub fn prices_in_range(&self) -> bool {
        let in_range = |price: Decimal| !price.is_sign_negative() && price <= MAX_ORDER_TOTAL;
        in_range(self.regular_price) && self.addon_price.is_none_or(in_range)
    }

    /// Eligible and priced for add-on sale.
    #[must_use]
    pub const fn can_be_addon(&self) -> bool {
        self.is_addon_eligible && self.addon_price.is_some()
    }
}

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(flatten)]
    pub snapshot: ItemSnapshot,
    pub quantity: u32,
    #[serde(default)]
    pub item_type: ItemType,
}

impl CartItem {
    #[must_use]
    pub const fn variant_id(&self) -> &VariantId {
        &self.snapshot.variant_id
    }
}

/// A promo code accepted by [`Cart::apply_promo_code`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPromo {
    pub code: String,
    /// Fraction, `0.10` for 10%.
    pub discount: Decimal,
    pub is_valid: bool,
}

/// Every derived value of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    #[serde(serialize_with = "money::serialize")]
    pub regular_subtotal: Decimal,
    #[serde(serialize_with = "money::serialize")]
    pub addon_subtotal: Decimal,
    #[serde(serialize_with = "money::serialize")]
    pub subtotal: Decimal,
    #[serde(serialize_with = "money::serialize")]
    pub promo_discount: Decimal,
    #[serde(serialize_with = "money::serialize")]
    pub shipping: Decimal,
    #[serde(serialize_with = "money::serialize")]
    pub total: Decimal,
    pub item_count: u32,
    #[serde(serialize_with = "money::serialize")]
    pub addon_threshold: Decimal,
    #[serde(serialize_with = "money::serialize")]
    pub amount_to_unlock_addons: Decimal,
    pub addons_unlocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo: Option<AppliedPromo>,
}

/// A shopper's cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartItem>,
    promo: Option<AppliedPromo>,
    addon_threshold: Decimal,
}

impl Cart {
    /// Empty cart with the given add-on unlock threshold.
    #[must_use]
    pub const fn new(addon_threshold: Decimal) -> Self {
        Self {
            items: Vec::new(),
            promo: None,
            addon_threshold,
        }
    }

    /// Rebuild a cart from a client-held snapshot.
    ///
    /// Zero-quantity lines are dropped and repeated variants are merged.
    #[must_use]
    pub fn from_items(addon_threshold: Decimal, items: impl IntoIterator<Item = CartItem>) -> Self {
        let mut cart = Self::new(addon_threshold);
        for item in items {
            if item.quantity == 0 {
                continue;
            }
            match cart.position(item.variant_id()) {
                Some(i) => {
                    if let Some(existing) = cart.items.get_mut(i) {
                        existing.quantity = existing.quantity.saturating_add(item.quantity);
                    }
                }
                None => cart.items.push(item),
            }
        }
        cart
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub const fn promo(&self) -> Option<&AppliedPromo> {
        self.promo.as_ref()
    }

    #[must_use]
    pub const fn addon_threshold(&self) -> Decimal {
        self.addon_threshold
    }

    fn position(&self, variant_id: &VariantId) -> Option<usize> {
        self.items.iter().position(|i| i.variant_id() == variant_id)
    }

    /// Sum of regular-type lines at regular price, `None` on overflow.
    #[must_use]
    pub fn regular_subtotal(&self) -> Option<Decimal> {
        self.items
            .iter()
            .filter(|i| i.item_type == ItemType::Regular)
            .map(|i| money::checked_line_total(i.snapshot.regular_price, i.quantity))
            .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line?))
    }

    #[must_use]
    pub fn addons_unlocked(&self) -> bool {
        self.regular_subtotal()
            .is_some_and(|subtotal| subtotal >= self.addon_threshold)
    }

    /// Unit price charged for a line.
    ///
    /// The add-on price applies only to an `addon` line that has one while
    /// add-ons are unlocked; every other case falls back to the regular price.
    #[must_use]
    pub fn item_price(&self, item: &CartItem) -> Decimal {
        let regular = item.snapshot.regular_price;
        if item.item_type != ItemType::Addon || !item.snapshot.is_addon_eligible {
            return regular;
        }
        match item.snapshot.addon_price {
            Some(addon) if self.addons_unlocked() => addon,
            _ => regular,
        }
    }

    /// Unit price times quantity for a line, `None` on overflow.
    #[must_use]
    pub fn line_total(&self, item: &CartItem) -> Option<Decimal> {
        money::checked_line_total(self.item_price(item), item.quantity)
    }

    /// Compute every derived value.
    ///
    /// # Errors
    ///
    /// `AmountOverflow` when a line total or sum does not fit in a `Decimal`.
    pub fn totals(&self) -> Result<CartTotals, CartError> {
        let regular_subtotal = self.regular_subtotal().ok_or(CartError::AmountOverflow)?;
        let addons_unlocked = regular_subtotal >= self.addon_threshold;

        let addon_subtotal = self
            .items
            .iter()
            .filter(|i| i.item_type == ItemType::Addon)
            .map(|i| self.line_total(i))
            .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line?))
            .ok_or(CartError::AmountOverflow)?;

        let subtotal = regular_subtotal
            .checked_add(addon_subtotal)
            .ok_or(CartError::AmountOverflow)?;
        let promo_discount = match self.promo.as_ref().filter(|p| p.is_valid) {
            Some(promo) => regular_subtotal
                .checked_mul(promo.discount)
                .ok_or(CartError::AmountOverflow)?,
            None => Decimal::ZERO,
        };
        let shipping = Decimal::ZERO;
        let total = subtotal
            .checked_sub(promo_discount)
            .and_then(|t| t.checked_add(shipping))
            .ok_or(CartError::AmountOverflow)?;
        let amount_to_unlock_addons = self
            .addon_threshold
            .checked_sub(regular_subtotal)
            .ok_or(CartError::AmountOverflow)?
            .max(Decimal::ZERO);

        Ok(CartTotals {
            regular_subtotal,
            addon_subtotal,
            subtotal,
            promo_discount,
            shipping,
            total,
            item_count: self.item_count(),
            addon_threshold: self.addon_threshold,
            amount_to_unlock_addons,
            addons_unlocked,
            promo: self.promo.clone(),
        })
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |n, i| n.saturating_add(i.quantity))
    }

    /// Add one unit of a variant.
    ///
    /// An existing line gains one unit and keeps its type. A new line is an
    /// add-on only when requested, eligible, and add-ons are unlocked.
    pub fn add_item(&mut self, snapshot: ItemSnapshot, as_addon: bool) {
        if let Some(i) = self.position(&snapshot.variant_id) {
            if let Some(existing) = self.items.get_mut(i) {
                existing.quantity = existing.quantity.saturating_add(1);
            }
            return;
        }

        let item_type = if as_addon && snapshot.can_be_addon() && self.addons_unlocked() {
            ItemType::Addon
        } else {
            ItemType::Regular
        };
        self.items.push(CartItem {
            snapshot,
            quantity: 1,
            item_type,
        });
    }

    /// Set a line's quantity; zero or less removes it.
    pub fn update_quantity(&mut self, variant_id: &VariantId, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(variant_id);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        if let Some(item) = self.items.iter_mut().find(|i| i.variant_id() == variant_id) {
            item.quantity = quantity;
        }
    }

    pub fn remove_item(&mut self, variant_id: &VariantId) {
        self.items.retain(|i| i.variant_id() != variant_id);
    }

    /// Flip an eligible line between regular and add-on. Ineligible lines
    /// are left alone.
    pub fn toggle_addon(&mut self, variant_id: &VariantId) {
        if let Some(item) = self.items.iter_mut().find(|i| i.variant_id() == variant_id) {
            if !item.snapshot.can_be_addon() {
                return;
            }
            item.item_type = match item.item_type {
                ItemType::Regular => ItemType::Addon,
                ItemType::Addon => ItemType::Regular,
            };
        }
    }

    /// Apply a checked promo code. Returns whether it was accepted.
    ///
    /// A rejected code leaves any previously applied code in place.
    pub fn apply_promo_code(&mut self, validation: &PromoValidation) -> bool {
        match validation.discount {
            Some(discount)
                if validation.valid && discount > Decimal::ZERO && discount <= Decimal::ONE =>
            {
                self.promo = Some(AppliedPromo {
                    code: validation.code.clone(),
                    discount,
                    is_valid: true,
                });
                true
            }
            _ => false,
        }
    }

    pub fn remove_promo_code(&mut self) {
        self.promo = None;
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.promo = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::promo::{PromoCode, evaluate};

    fn snapshot(variant: &str, price: Decimal, addon: Option<Decimal>) -> ItemSnapshot {
        ItemSnapshot {
            product_id: ProductId::new(format!("P-{variant}")),
            product_title: format!("Product {variant}"),
            product_image: String::new(),
            category: None,
            variant_id: VariantId::new(variant),
            variant_title: "Default".to_string(),
            sku: None,
            regular_price: price,
            addon_price: addon,
            is_addon_eligible: addon.is_some(),
        }
    }

    fn ten_percent() -> PromoValidation {
        evaluate(
            "save10",
            Some(&PromoCode {
                code: "SAVE10".to_string(),
                active: true,
                discount_percent: dec!(10),
            }),
        )
    }

    #[test]
    fn test_scenarios_a_b_c() {
        let mut cart = Cart::new(dec!(100));
        cart.add_item(snapshot("a", dec!(80), None), false);

        let totals = cart.totals().unwrap();
        assert_eq!(totals.regular_subtotal, dec!(80));
        assert!(!totals.addons_unlocked);
        assert_eq!(totals.amount_to_unlock_addons, dec!(20));

        cart.add_item(snapshot("b", dec!(30), None), false);
        let totals = cart.totals().unwrap();
        assert_eq!(totals.regular_subtotal, dec!(110));
        assert!(totals.addons_unlocked);
        assert_eq!(totals.amount_to_unlock_addons, dec!(0));

        assert!(cart.apply_promo_code(&ten_percent()));
        let totals = cart.totals().unwrap();
        assert_eq!(totals.promo_discount, dec!(11.00));
        assert_eq!(totals.total, dec!(99.00));
        assert_eq!(totals.shipping, dec!(0));

        let json = serde_json::to_value(&totals).unwrap();
        assert_eq!(json["promoDiscount"], "11.00");
        assert_eq!(json["total"], "99.00");
    }

    #[test]
    fn test_addon_request_ignored_before_threshold() {
        let mut cart = Cart::new(dec!(30));
        cart.add_item(snapshot("x", dec!(10), Some(dec!(6))), true);
        assert_eq!(cart.items()[0].item_type, ItemType::Regular);

        cart.add_item(snapshot("big", dec!(40), None), false);
        cart.add_item(snapshot("y", dec!(10), Some(dec!(6))), true);
        assert_eq!(cart.items()[2].item_type, ItemType::Addon);
        assert_eq!(cart.totals().unwrap().addon_subtotal, dec!(6));
    }

    #[test]
    fn test_falling_below_threshold_stops_discount_but_keeps_flag() {
        let mut cart = Cart::new(dec!(30));
        cart.add_item(snapshot("big", dec!(40), None), false);
        cart.add_item(snapshot("y", dec!(10), Some(dec!(6))), true);
        assert!(cart.addons_unlocked());

        cart.remove_item(&VariantId::new("big"));
        let totals = cart.totals().unwrap();
        assert!(!totals.addons_unlocked);
        assert_eq!(cart.items()[0].item_type, ItemType::Addon);
        assert_eq!(totals.addon_subtotal, dec!(10));
        assert_eq!(totals.regular_subtotal, dec!(0));
    }

    #[test]
    fn test_existing_item_increments_quantity() {
        let mut cart = Cart::new(dec!(30));
        cart.add_item(snapshot("a", dec!(5), None), false);
        cart.add_item(snapshot("a", dec!(5), None), false);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let mut cart = Cart::new(dec!(30));
        cart.add_item(snapshot("a", dec!(5), None), false);
        cart.add_item(snapshot("b", dec!(5), None), false);

        cart.update_quantity(&VariantId::new("a"), 4);
        assert_eq!(cart.item_count(), 5);

        cart.update_quantity(&VariantId::new("a"), 0);
        cart.update_quantity(&VariantId::new("b"), -3);
        assert!(cart.items().is_empty());
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn test_item_count_tracks_quantities() {
        let mut cart = Cart::new(dec!(30));
        let ops: [(&str, i64); 6] = [("a", 3), ("b", 2), ("a", 1), ("c", 0), ("b", 7), ("a", -1)];
        for (variant, _) in &ops {
            cart.add_item(snapshot(variant, dec!(1), None), false);
        }
        for (variant, qty) in ops {
            cart.update_quantity(&VariantId::new(variant), qty);
            let sum: u32 = cart.items().iter().map(|i| i.quantity).sum();
            assert_eq!(cart.item_count(), sum);
            assert!(cart.items().iter().all(|i| i.quantity > 0));
        }
    }

    #[test]
    fn test_subtotal_is_exact_sum() {
        let mut cart = Cart::new(dec!(30));
        cart.add_item(snapshot("a", dec!(33.333), None), false);
        cart.add_item(snapshot("b", dec!(9.99), Some(dec!(4.995))), true);
        cart.update_quantity(&VariantId::new("a"), 3);
        let totals = cart.totals().unwrap();
        assert_eq!(totals.subtotal, totals.regular_subtotal + totals.addon_subtotal);
        assert_eq!(totals.addon_subtotal, dec!(4.995));
        assert_eq!(totals.subtotal, dec!(104.994));
    }

    #[test]
    fn test_toggle_addon_only_for_eligible() {
        let mut cart = Cart::new(dec!(30));
        cart.add_item(snapshot("plain", dec!(10), None), false);
        cart.add_item(snapshot("deal", dec!(10), Some(dec!(5))), false);

        cart.toggle_addon(&VariantId::new("plain"));
        cart.toggle_addon(&VariantId::new("deal"));
        assert_eq!(cart.items()[0].item_type, ItemType::Regular);
        assert_eq!(cart.items()[1].item_type, ItemType::Addon);

        cart.toggle_addon(&VariantId::new("deal"));
        assert_eq!(cart.items()[1].item_type, ItemType::Regular);
    }

    #[test]
    fn test_addon_without_price_falls_back_to_regular() {
        let mut cart = Cart::new(dec!(0));
        let mut item = snapshot("odd", dec!(12), None);
        item.is_addon_eligible = true;
        let cart_item = CartItem {
            snapshot: item,
            quantity: 1,
            item_type: ItemType::Addon,
        };
        cart = Cart::from_items(cart.addon_threshold(), [cart_item]);
        assert_eq!(cart.item_price(&cart.items()[0]), dec!(12));
        assert_eq!(cart.totals().unwrap().addon_subtotal, dec!(12));
    }

    #[test]
    fn test_invalid_promo_keeps_previous() {
        let mut cart = Cart::new(dec!(30));
        cart.add_item(snapshot("a", dec!(50), None), false);
        assert!(cart.apply_promo_code(&ten_percent()));

        assert!(!cart.apply_promo_code(&evaluate("bogus", None)));
        assert_eq!(cart.promo().unwrap().code, "SAVE10");
        assert_eq!(cart.totals().unwrap().promo_discount, dec!(5));

        cart.remove_promo_code();
        assert_eq!(cart.totals().unwrap().promo_discount, dec!(0));
    }

    #[test]
    fn test_discount_over_whole_price_is_refused() {
        let mut cart = Cart::new(dec!(30));
        cart.add_item(snapshot("a", dec!(50), None), false);
        let forged = PromoValidation {
            valid: true,
            code: "GREEDY".to_string(),
            discount: Some(dec!(1.5)),
            message: String::new(),
        };
        assert!(!cart.apply_promo_code(&forged));
        assert_eq!(cart.totals().unwrap().total, dec!(50));
    }

    #[test]
    fn test_promo_skips_addon_items() {
        let mut cart = Cart::new(dec!(30));
        cart.add_item(snapshot("big", dec!(100), None), false);
        cart.add_item(snapshot("deal", dec!(20), Some(dec!(10))), true);
        cart.apply_promo_code(&ten_percent());
        let totals = cart.totals().unwrap();
        assert_eq!(totals.promo_discount, dec!(10));
        assert_eq!(totals.total, dec!(100));
    }

    #[test]
    fn test_from_items_merges_and_drops_empty_lines() {
        let line = |variant: &str, quantity| CartItem {
            snapshot: snapshot(variant, dec!(2), None),
            quantity,
            item_type: ItemType::Regular,
        };
        let cart = Cart::from_items(dec!(30), [line("a", 1), line("a", 2), line("b", 0)]);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_price_range() {
        assert!(snapshot("a", dec!(0), Some(dec!(0))).prices_in_range());
        assert!(snapshot("a", MAX_ORDER_TOTAL, None).prices_in_range());
        assert!(!snapshot("a", dec!(-0.01), None).prices_in_range());
        assert!(!snapshot("a", dec!(10000.01), None).prices_in_range());
        assert!(!snapshot("a", dec!(10), Some(Decimal::MAX)).prices_in_range());
    }

    #[test]
    fn test_oversized_amounts_have_no_totals() {
        let line = |variant: &str, price, quantity| CartItem {
            snapshot: snapshot(variant, price, None),
            quantity,
            item_type: ItemType::Regular,
        };

        let cart = Cart::from_items(dec!(30), [line("huge", Decimal::MAX, 2)]);
        assert_eq!(cart.regular_subtotal(), None);
        assert!(!cart.addons_unlocked());
        assert_eq!(cart.totals(), Err(CartError::AmountOverflow));

        let cart = Cart::from_items(
            dec!(30),
            [line("a", Decimal::MAX, 1), line("b", Decimal::MAX, 1)],
        );
        assert_eq!(cart.totals(), Err(CartError::AmountOverflow));

        let cart = Cart::from_items(dec!(30), [line("a", dec!(20), u32::MAX)]);
        assert!(cart.totals().is_ok());
    }

    #[test]
    fn test_cart_item_json_is_flat() {
        let json = serde_json::json!({
            "productId": "PZ-1",
            "productTitle": "Vest",
            "variantId": "v1",
            "variantTitle": "Black",
            "regularPrice": 25.5,
            "addonPrice": "12.00",
            "isAddonEligible": true,
            "quantity": 2,
            "itemType": "addon"
        });
        let item: CartItem = serde_json::from_value(json).unwrap();
        assert_eq!(item.snapshot.regular_price, dec!(25.5));
        assert_eq!(item.snapshot.addon_price, Some(dec!(12)));
        assert_eq!(item.item_type, ItemType::Addon);
    }
}
