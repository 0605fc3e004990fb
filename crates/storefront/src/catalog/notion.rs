//! Catalog read entirely from Notion databases.
//!
//! The products database holds one page per product. Variants come from the
//! optional variants database, linked through a `Product` relation or a
//! `Product` text property holding the product `ID`. Without a variants
//! database every product gets a single default variant priced from its
//! `Price CAD` property.

use std::collections::HashMap;

use async_trait::async_trait;
use protocol_zero_core::catalog::{DEFAULT_MARGIN, PLACEHOLDER_IMAGE, Product, Variant, VariantOption};
use protocol_zero_core::{ProductId, VariantId};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use super::CatalogRepository;
use crate::notion::properties as prop;
use crate::notion::{NotionClient, Page};
use crate::repository::Result;

/// Products and variants from Notion.
#[derive(Clone)]
pub struct NotionCatalog {
    client: NotionClient,
}

impl NotionCatalog {
    #[must_use]
    pub const fn new(client: NotionClient) -> Self {
        Self { client }
    }

    async fn variant_pages(&self) -> Result<Vec<Page>> {
        match self.client.variants_database() {
            Some(database) => Ok(self.client.query_database(database, None).await?),
            None => Ok(Vec::new()),
        }
    }

    fn assemble(&self, product_pages: &[Page], variant_pages: &[Page]) -> Vec<Product> {
        let mut grouped = group_variants(product_pages, variant_pages);
        let mut products: Vec<Product> = product_pages
            .iter()
            .map(|page| {
                let variants = grouped.remove(&page.id).unwrap_or_default();
                let mut product = product_from_page(page, variants);
                let images = self.client.images_from_properties(&page.properties);
                if let Some(first) = images.images.first() {
                    product.primary_image.clone_from(first);
                    product.images = images.images;
                }
                product.detail_long_image = images.detail_image;
                product
            })
            .collect();
        products.sort_by(|a, b| a.title.cmp(&b.title));
        products
    }
}

fn text_or_select(props: &Map<String, Value>, name: &str) -> Option<String> {
    prop::plain_text(props, name).or_else(|| prop::select(props, name))
}

#[async_trait]
impl CatalogRepository for NotionCatalog {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>> {
        let database = self.client.products_database()?.to_string();
        let filter = json!({ "property": "Status", "select": { "equals": "Active" } });
        let product_pages = self.client.query_database(&database, Some(filter)).await?;
        let variant_pages = self.variant_pages().await?;

        let products = self.assemble(&product_pages, &variant_pages);
        debug!(count = products.len(), "Loaded catalog from Notion");
        Ok(products)
    }

    #[instrument(skip(self))]
    async fn get_product(&self, id: &str) -> Result<Option<Product>> {
        let page = match self.client.find_product_page(id, id).await? {
            Some(page) => page,
            None => {
                let database = self.client.products_database()?.to_string();
                let pages = self.client.query_database(&database, None).await?;
                match pages.into_iter().find(|page| page.id == id) {
                    Some(page) => page,
                    None => return Ok(None),
                }
            }
        };
        let variant_pages = self.variant_pages().await?;
        Ok(self
            .assemble(std::slice::from_ref(&page), &variant_pages)
            .into_iter()
            .next())
    }
}

/// Variants keyed by the page id of their product.
fn group_variants(products: &[Page], variants: &[Page]) -> HashMap<String, Vec<Variant>> {
    let mut by_key: HashMap<String, String> = HashMap::new();
    for page in products {
        if let Some(id) = prop::plain_text(&page.properties, "ID") {
            by_key.entry(id).or_insert_with(|| page.id.clone());
        }
        by_key.entry(page.id.clone()).or_insert_with(|| page.id.clone());
    }

    let mut grouped: HashMap<String, Vec<Variant>> = HashMap::new();
    for page in variants {
        let mut links = prop::relation(&page.properties, "Product");
        links.extend(prop::plain_text(&page.properties, "Product"));
        if let Some(product) = links.iter().find_map(|link| by_key.get(link)) {
            grouped
                .entry(product.clone())
                .or_default()
                .push(variant_from_page(page));
        }
    }
    for list in grouped.values_mut() {
        list.sort_by_key(|v| v.sort_order);
    }
    grouped
}

pub(crate) fn product_from_page(page: &Page, mut variants: Vec<Variant>) -> Product {
    let props = &page.properties;
    let sku = prop::plain_text(props, "SKU").unwrap_or_default();
    let id = prop::plain_text(props, "ID")
        .or_else(|| (!sku.is_empty()).then(|| sku.clone()))
        .unwrap_or_else(|| page.id.clone());

    if variants.is_empty()
        && let Some(price) = prop::number(props, "Price CAD").filter(|p| !p.is_zero())
    {
        variants.push(Variant {
            id: VariantId::new(page.id.clone()),
            title: "Default".to_string(),
            sku: (!sku.is_empty()).then(|| sku.clone()),
            cny_price: prop::number(props, "Price CNY").unwrap_or_default(),
            price_cad: Some(price),
            in_stock: prop::checkbox(props, "Stock"),
            status: "Active".to_string(),
            sort_order: 0,
            options: Vec::new(),
            is_addon_eligible: false,
            addon_price_cad: None,
            addon_cost_cad: None,
            addon_margin: None,
            min_cart_for_addon: None,
        });
    }

    Product {
        id: ProductId::new(id),
        record_id: page.id.clone(),
        sku,
        title: prop::plain_text(props, "Title").unwrap_or_default(),
        title_original: prop::plain_text(props, "Title Original"),
        category: text_or_select(props, "Category"),
        description: prop::plain_text(props, "Description"),
        base_price_cad: Decimal::ZERO,
        margin: prop::number(props, "Margin")
            .filter(|m| !m.is_zero())
            .unwrap_or(DEFAULT_MARGIN),
        primary_image: PLACEHOLDER_IMAGE.to_string(),
        images: vec![PLACEHOLDER_IMAGE.to_string()],
        detail_long_image: None,
        status: prop::select(props, "Status").unwrap_or_else(|| "Active".to_string()),
        in_stock: prop::checkbox(props, "Stock"),
        source_url: prop::url(props, "URL"),
        variants,
    }
}

pub(crate) fn variant_from_page(page: &Page) -> Variant {
    let props = &page.properties;
    let options = [("Option Type 1", "Option Value 1"), ("Option Type 2", "Option Value 2")]
        .into_iter()
        .filter_map(|(name, value)| {
            Some(VariantOption {
                name: text_or_select(props, name)?,
                value: text_or_select(props, value)?,
            })
        })
        .collect();
    let addon_price_cad = prop::number(props, "Addon Price CAD");

    Variant {
        id: VariantId::new(page.id.clone()),
        title: prop::plain_text(props, "Variant Name").unwrap_or_else(|| "Default".to_string()),
        sku: prop::plain_text(props, "SKU"),
        cny_price: prop::number(props, "Price CNY").unwrap_or_default(),
        price_cad: prop::number(props, "Price CAD").filter(|p| !p.is_zero()),
        in_stock: prop::checkbox(props, "Stock"),
        status: prop::select(props, "Status").unwrap_or_else(|| "Active".to_string()),
        sort_order: prop::number(props, "Sort Order")
            .and_then(|n| n.trunc().to_i64())
            .unwrap_or_default(),
        options,
        is_addon_eligible: prop::checkbox(props, "Is Addon Item").unwrap_or(false)
            && addon_price_cad.is_some(),
        addon_price_cad,
        addon_cost_cad: prop::number(props, "Addon Cost CAD"),
        addon_margin: prop::number(props, "Addon Margin"),
        min_cart_for_addon: prop::number(props, "Min Cart For Addon"),
    }
}
