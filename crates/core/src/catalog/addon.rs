//! Add-on offers: variants sold at a discount once the cart qualifies.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::Product;
use crate::types::money;
use crate::types::{ProductId, VariantId};

/// A variant currently offered at add-on pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonOffer {
    pub product_id: ProductId,
    pub product_title: String,
    pub product_image: String,
    pub variant_id: VariantId,
    pub variant_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(serialize_with = "money::serialize")]
    pub regular_price: Decimal,
    #[serde(serialize_with = "money::serialize")]
    pub addon_price: Decimal,
    #[serde(serialize_with = "money::serialize")]
    pub savings: Decimal,
    /// Whole percent off the regular price.
    pub savings_percent: i64,
}

/// Collect every add-on eligible variant, best deal first.
///
/// A variant qualifies when it is flagged eligible and has both an add-on
/// price and a positive regular price. Ties keep catalog order.
#[must_use]
pub fn addon_offers(products: &[Product]) -> Vec<AddonOffer> {
    let mut offers: Vec<AddonOffer> = products
        .iter()
        .flat_map(|product| {
            product.variants.iter().filter_map(move |variant| {
                if !variant.is_addon_eligible {
                    return None;
                }
                let addon_price = variant.addon_price_cad?;
                let regular_price = variant.price_cad.filter(|p| *p > Decimal::ZERO)?;
                let savings = regular_price - addon_price;
                let savings_percent = (savings / regular_price * Decimal::ONE_HUNDRED)
                    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                    .try_into()
                    .unwrap_or_default();

                Some(AddonOffer {
                    product_id: product.id.clone(),
                    product_title: product.title.clone(),
                    product_image: product.primary_image.clone(),
                    variant_id: variant.id.clone(),
                    variant_title: variant.title.clone(),
                    sku: variant.sku.clone(),
                    regular_price,
                    addon_price,
                    savings,
                    savings_percent,
                })
            })
        })
        .collect();

    offers.sort_by(|a, b| b.savings_percent.cmp(&a.savings_percent));
    offers
}
