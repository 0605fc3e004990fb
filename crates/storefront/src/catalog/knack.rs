//! Catalog read from the Knack products and variants objects.
//!
//! Product data lives in Knack; gallery images live in Notion pages keyed by
//! the product `ID` (or `SKU`). Images that cannot be fetched fall back to the
//! Knack file fields, then to the placeholder image.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::join_all;
use protocol_zero_core::catalog::{DEFAULT_MARGIN, PLACEHOLDER_IMAGE, Product, Variant, VariantOption};
use protocol_zero_core::{ProductId, VariantId};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, instrument, warn};

use super::CatalogRepository;
use crate::config::{KnackConfig, ProductFields, VariantFields};
use crate::knack::fields;
use crate::knack::{KnackClient, Record, RecordQuery, SortOrder};
use crate::notion::{NotionClient, ProductImages};
use crate::repository::Result;

/// Products from Knack, images from Notion.
#[derive(Clone)]
pub struct KnackCatalog {
    client: KnackClient,
    notion: NotionClient,
    products_object: String,
    variants_object: String,
    products: ProductFields,
    variants: VariantFields,
}

impl KnackCatalog {
    #[must_use]
    pub fn new(client: KnackClient, notion: NotionClient, config: &KnackConfig) -> Self {
        Self {
            client,
            notion,
            products_object: config.objects.products.clone(),
            variants_object: config.objects.variants.clone(),
            products: config.fields.products.clone(),
            variants: config.fields.variants.clone(),
        }
    }

    async fn all_variants(&self) -> Result<Vec<Record>> {
        let query = RecordQuery::new().sort(&self.variants.sort_order, SortOrder::Asc);
        Ok(self
            .client
            .get_records(&self.variants_object, &query)
            .await?)
    }

    async fn find_product_record(&self, id: &str) -> Result<Option<Record>> {
        for field in [&self.products.id, &self.products.sku] {
            let query = RecordQuery::new().filter(field, id).page(1, 1);
            let mut records = self
                .client
                .get_records(&self.products_object, &query)
                .await?;
            if !records.is_empty() {
                return Ok(Some(records.swap_remove(0)));
            }
        }
        Ok(self.client.get_record(&self.products_object, id).await?)
    }

    /// Images from Notion. Failures are logged and treated as "no images".
    async fn images_for(&self, product_id: &str, sku: &str) -> ProductImages {
        if !self.notion.is_configured() {
            return ProductImages::default();
        }
        match self.notion.product_images(product_id, sku).await {
            Ok(images) => images,
            Err(e) => {
                warn!(error = %e, product_id, "Failed to fetch product images");
                ProductImages::default()
            }
        }
    }

    async fn build_product(&self, record: &Record, variants: Vec<Variant>) -> Product {
        let mut product = product_from_record(record, &self.products, variants);
        let images = self.images_for(product.id.as_str(), &product.sku).await;
        apply_images(&mut product, images);
        product
    }
}

#[async_trait]
impl CatalogRepository for KnackCatalog {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>> {
        let query = RecordQuery::new()
            .filter(&self.products.status, "Active")
            .sort(&self.products.title, SortOrder::Asc);
        let product_records = self
            .client
            .get_records(&self.products_object, &query)
            .await?;
        let variant_records = self.all_variants().await?;

        let mut grouped = group_variants(
            &product_records,
            &variant_records,
            &self.products,
            &self.variants,
        );

        let builds = product_records.iter().filter_map(|record| {
            let record_id = fields::record_id(record)?;
            let variants = grouped.remove(&record_id).unwrap_or_default();
            Some(self.build_product(record, variants))
        });
        let products = join_all(builds).await;

        debug!(count = products.len(), "Loaded catalog from Knack");
        Ok(products)
    }

    #[instrument(skip(self))]
    async fn get_product(&self, id: &str) -> Result<Option<Product>> {
        let Some(record) = self.find_product_record(id).await? else {
            return Ok(None);
        };
        let variant_records = self.all_variants().await?;
        let mut grouped = group_variants(
            std::slice::from_ref(&record),
            &variant_records,
            &self.products,
            &self.variants,
        );
        let variants = fields::record_id(&record)
            .and_then(|record_id| grouped.remove(&record_id))
            .unwrap_or_default();

        Ok(Some(self.build_product(&record, variants).await))
    }
}

/// Variants keyed by the record id of the product they belong to.
///
/// A variant's product connection may name either the product's `ID` field or
/// its record id. Unmatched variants are dropped. Input order is kept.
fn group_variants(
    products: &[Record],
    variants: &[Record],
    pf: &ProductFields,
    vf: &VariantFields,
) -> HashMap<String, Vec<Variant>> {
    let mut by_key: HashMap<String, String> = HashMap::new();
    for product in products {
        let Some(record_id) = fields::record_id(product) else {
            continue;
        };
        if let Some(id) = fields::text(fields::field(product, &pf.id, "ID")) {
            by_key.entry(id).or_insert_with(|| record_id.clone());
        }
        by_key.entry(record_id.clone()).or_insert(record_id);
    }

    let mut grouped: HashMap<String, Vec<Variant>> = HashMap::new();
    for record in variants {
        let connection = fields::field(record, &vf.product, "Product");
        let matched = fields::connection_values(connection, &pf.id)
            .into_iter()
            .find_map(|value| by_key.get(&value).cloned());
        match matched {
            Some(product_record_id) => grouped
                .entry(product_record_id)
                .or_default()
                .push(variant_from_record(record, vf)),
            None => debug!(variant = ?fields::record_id(record), "Variant matches no active product"),
        }
    }
    grouped
}

pub(crate) fn product_from_record(record: &Record, f: &ProductFields, variants: Vec<Variant>) -> Product {
    let get = |key: &str, name: &str| fields::field(record, key, name);
    let record_id = fields::record_id(record).unwrap_or_default();
    let sku = fields::text(get(&f.sku, "SKU")).unwrap_or_default();
    let id = fields::text(get(&f.id, "ID"))
        .or_else(|| (!sku.is_empty()).then(|| sku.clone()))
        .unwrap_or_else(|| record_id.clone());

    let mut images = Vec::new();
    if let Some(primary) = fields::image_url(get(&f.primary_image, "Primary Image")) {
        images.push(primary);
    }
    for url in fields::image_urls(get(&f.images, "Images")) {
        if !images.contains(&url) {
            images.push(url);
        }
    }

    Product {
        id: ProductId::new(id),
        record_id,
        sku,
        title: fields::text(get(&f.title, "Title")).unwrap_or_default(),
        title_original: fields::text(get(&f.title_original, "Title Original")),
        category: fields::text(get(&f.category, "Category")),
        description: fields::text(get(&f.description, "Description")),
        base_price_cad: Decimal::ZERO,
        margin: fields::decimal(get(&f.margin, "Margin"))
            .filter(|m| !m.is_zero())
            .unwrap_or(DEFAULT_MARGIN),
        primary_image: images
            .first()
            .cloned()
            .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
        images,
        detail_long_image: fields::image_url(get(&f.detail_image, "Detail Image")),
        status: fields::text(get(&f.status, "Status")).unwrap_or_else(|| "Active".to_string()),
        in_stock: fields::stock_flag(get(&f.stock, "Stock")),
        source_url: fields::text(get(&f.url, "URL")),
        variants,
    }
}

/// Prefer Notion images; keep the record's own images otherwise; never leave
/// a product without a primary image.
fn apply_images(product: &mut Product, found: ProductImages) {
    if !found.images.is_empty() {
        product.images = found.images;
    }
    if found.detail_image.is_some() {
        product.detail_long_image = found.detail_image;
    }
    if product.images.is_empty() {
        product.images.push(PLACEHOLDER_IMAGE.to_string());
    }
    product.primary_image = product
        .images
        .first()
        .cloned()
        .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());
}

pub(crate) fn variant_from_record(record: &Record, f: &VariantFields) -> Variant {
    let get = |key: &str, name: &str| fields::field(record, key, name);

    let options = [
        (&f.option_type_1, &f.option_value_1, "Option Type 1", "Option Value 1"),
        (&f.option_type_2, &f.option_value_2, "Option Type 2", "Option Value 2"),
    ]
    .into_iter()
    .filter_map(|(type_key, value_key, type_name, value_name)| {
        Some(VariantOption {
            name: fields::text(get(type_key, type_name))?,
            value: fields::text(get(value_key, value_name))?,
        })
    })
    .collect();

    let addon_price_cad = fields::decimal(get(&f.addon_price_cad, "Addon Price CAD"));

    Variant {
        id: VariantId::new(fields::record_id(record).unwrap_or_default()),
        title: fields::text(get(&f.name, "Variant Name")).unwrap_or_else(|| "Default".to_string()),
        sku: fields::text(get(&f.sku, "SKU")),
        cny_price: fields::decimal(get(&f.price_cny, "Price CNY")).unwrap_or_default(),
        price_cad: fields::decimal(get(&f.price_cad, "Selling Price")).filter(|p| !p.is_zero()),
        in_stock: fields::stock_flag(get(&f.stock, "Stock")),
        status: fields::text(get(&f.status, "Status")).unwrap_or_else(|| "Active".to_string()),
        sort_order: fields::decimal(get(&f.sort_order, "Sort Order"))
            .and_then(|d| d.trunc().to_i64())
            .unwrap_or_default(),
        options,
        is_addon_eligible: fields::flag(get(&f.is_addon, "Is Addon Item")) && addon_price_cad.is_some(),
        addon_price_cad,
        addon_cost_cad: fields::decimal(get(&f.addon_cost_cad, "Addon Cost CAD")),
        addon_margin: fields::decimal(get(&f.addon_margin, "Addon Margin")),
        min_cart_for_addon: fields::decimal(get(&f.min_cart_for_addon, "Min Cart For Addon")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};

    use super::*;
    use crate::config::KnackFields;

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    fn product_record() -> Record {
        record(json!({
            "id": "rec_p1",
            "field_45": "PZ-001",
            "field_46": "SKU-001",
            "field_47": "Tactical Vest",
            "field_48": "战术背心",
            "field_51": "Active",
            "field_53": "0.45",
            "field_54": "Yes",
            "field_55": "https://item.taobao.com/item.htm?id=1"
        }))
    }

    fn variant_record(id: &str, connection: Value, sort: i64) -> Record {
        record(json!({
            "id": id,
            "field_61": connection,
            "field_62": format!("Variant {id}"),
            "field_64": 120,
            "field_138": "$89.00",
            "field_68": sort,
            "field_145": "Color",
            "field_146": "Black",
            "field_158": "Yes",
            "field_159": 15
        }))
    }

    #[test]
    fn test_product_mapping() {
        let fields = KnackFields::default();
        let product = product_from_record(&product_record(), &fields.products, Vec::new());

        assert_eq!(product.id.as_str(), "PZ-001");
        assert_eq!(product.record_id, "rec_p1");
        assert_eq!(product.margin, dec!(0.45));
        assert_eq!(product.in_stock, Some(true));
        assert_eq!(product.title_original.as_deref(), Some("战术背心"));
        assert_eq!(product.primary_image, PLACEHOLDER_IMAGE);
        assert_eq!(product.base_price_cad, Decimal::ZERO);
    }

    #[test]
    fn test_product_id_falls_back_to_sku_then_record_id() {
        let fields = KnackFields::default();
        let mut rec = product_record();
        rec.remove("field_45");
        assert_eq!(product_from_record(&rec, &fields.products, Vec::new()).id.as_str(), "SKU-001");
        rec.remove("field_46");
        assert_eq!(product_from_record(&rec, &fields.products, Vec::new()).id.as_str(), "rec_p1");
    }

    #[test]
    fn test_missing_margin_uses_default() {
        let fields = KnackFields::default();
        let mut rec = product_record();
        rec.remove("field_53");
        assert_eq!(
            product_from_record(&rec, &fields.products, Vec::new()).margin,
            DEFAULT_MARGIN
        );
    }

    #[test]
    fn test_variant_mapping() {
        let fields = KnackFields::default();
        let variant = variant_from_record(&variant_record("rec_v1", json!("PZ-001"), 2), &fields.variants);

        assert_eq!(variant.id.as_str(), "rec_v1");
        assert_eq!(variant.price_cad, Some(dec!(89.00)));
        assert_eq!(variant.cny_price, dec!(120));
        assert_eq!(variant.sort_order, 2);
        assert_eq!(variant.status, "Active");
        assert!(variant.is_addon_eligible);
        assert_eq!(variant.addon_price_cad, Some(dec!(15)));
        assert_eq!(
            variant.options,
            vec![VariantOption {
                name: "Color".to_string(),
                value: "Black".to_string()
            }]
        );
    }

    #[test]
    fn test_variants_group_by_id_field_or_record_id() {
        let fields = KnackFields::default();
        let products = vec![product_record()];
        let variants = vec![
            variant_record("rec_v1", json!("PZ-001"), 1),
            variant_record("rec_v2", json!([{ "id": "rec_p1", "identifier": "Tactical Vest" }]), 2),
            variant_record(
                "rec_v3",
                json!("<span data-kn=\"connection-value\">PZ-001</span>"),
                3,
            ),
            variant_record("rec_orphan", json!("PZ-999"), 4),
        ];

        let grouped = group_variants(&products, &variants, &fields.products, &fields.variants);
        let ids: Vec<&str> = grouped["rec_p1"].iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["rec_v1", "rec_v2", "rec_v3"]);
        assert_eq!(grouped.len(), 1);
    }

    #[test]
    fn test_apply_images_prefers_found_images() {
        let fields = KnackFields::default();
        let mut product = product_from_record(&product_record(), &fields.products, Vec::new());
        apply_images(
            &mut product,
            ProductImages {
                images: vec!["https://cdn.example.com/1.jpg".to_string()],
                detail_image: None,
            },
        );
        assert_eq!(product.primary_image, "https://cdn.example.com/1.jpg");

        let mut bare = product_from_record(&product_record(), &fields.products, Vec::new());
        apply_images(&mut bare, ProductImages::default());
        assert_eq!(bare.images, vec![PLACEHOLDER_IMAGE.to_string()]);
    }
}
