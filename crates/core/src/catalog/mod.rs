//! Catalog model.
//!
//! [`Product`] and [`Variant`] carry every field the record store holds,
//! including cost and margin data. Anything returned to shoppers goes
//! through [`Product::to_public`] first, which drops those fields.

mod addon;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, VariantId};

pub use addon::{AddonOffer, addon_offers};

/// Image shown when a product has none.
pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder.png";

/// Margin assumed when a product record has none.
pub const DEFAULT_MARGIN: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// One option dimension of a variant, e.g. `Color: Black`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOption {
    pub name: String,
    pub value: String,
}

/// A purchasable variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: VariantId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// Supplier cost in CNY.
    #[serde(default)]
    pub cny_price: Decimal,
    /// Sale price in CAD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_cad: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
    #[serde(default = "active")]
    pub status: String,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<VariantOption>,
    #[serde(default)]
    pub is_addon_eligible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addon_price_cad: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addon_cost_cad: Option<Decimal>,
    /// Achieved add-on margin, percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addon_margin: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_cart_for_addon: Option<Decimal>,
}

fn active() -> String {
    "Active".to_string()
}

/// A catalog product with its variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Public id used in URLs.
    pub id: ProductId,
    /// Record-store id.
    pub record_id: String,
    #[serde(default)]
    pub sku: String,
    pub title: String,
    /// Title as listed by the supplier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_original: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub base_price_cad: Decimal,
    pub margin: Decimal,
    pub primary_image: String,
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_long_image: Option<String>,
    #[serde(default = "active")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
    /// Supplier listing URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl Product {
    /// Whether the product is listed in the storefront.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }

    /// Find a variant by id.
    #[must_use]
    pub fn variant(&self, id: &VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| &v.id == id)
    }

    /// Copy with cost, margin and supplier data removed.
    #[must_use]
    pub fn to_public(&self) -> PublicProduct {
        PublicProduct {
            id: self.id.clone(),
            sku: self.sku.clone(),
            title: self.title.clone(),
            category: self.category.clone(),
            description: self.description.clone(),
            primary_image: self.primary_image.clone(),
            images: self.images.clone(),
            detail_long_image: self.detail_long_image.clone(),
            variants: self.variants.iter().map(Variant::to_public).collect(),
        }
    }
}

impl Variant {
    /// Copy with cost, margin and internal ordering removed.
    #[must_use]
    pub fn to_public(&self) -> PublicVariant {
        PublicVariant {
            id: self.id.clone(),
            title: self.title.clone(),
            sku: self.sku.clone(),
            price_cad: self.price_cad,
            in_stock: self.in_stock,
            options: self.options.clone(),
            is_addon_eligible: self.is_addon_eligible,
            addon_price_cad: self.addon_price_cad,
        }
    }
}

/// Product as shoppers see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProduct {
    pub id: ProductId,
    pub sku: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub primary_image: String,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_long_image: Option<String>,
    pub variants: Vec<PublicVariant>,
}

/// Variant as shoppers see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicVariant {
    pub id: VariantId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(
        serialize_with = "crate::types::money::serialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub price_cad: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<VariantOption>,
    pub is_addon_eligible: bool,
    #[serde(
        serialize_with = "crate::types::money::serialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub addon_price_cad: Option<Decimal>,
}
