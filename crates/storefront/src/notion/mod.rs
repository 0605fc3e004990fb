//! Notion REST client.
//!
//! The products database doubles as the image store: each page carries the
//! product `ID` and `SKU` as rich text plus `Images` and `Detail Image` file
//! properties. When the catalog backend is `notion`, the same database (and
//! an optional variants database) also provides product data.

pub mod properties;

use std::sync::Arc;

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::NotionConfig;

const PAGE_SIZE: u32 = 100;

/// Errors that can occur when talking to Notion.
#[derive(Debug, Error)]
pub enum NotionError {
    /// API key or database id missing.
    #[error("Notion is not configured (set NOTION_API_KEY and NOTION_DATABASE_ID_PRODUCTS)")]
    NotConfigured,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Notion answered with a non-success status.
    #[error("Notion API error {status}: {body}")]
    Api { status: u16, body: String },
}

/// A database page.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Page>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

/// Gallery and long detail image of a product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductImages {
    pub images: Vec<String>,
    pub detail_image: Option<String>,
}

// =============================================================================
// NotionClient
// =============================================================================

/// Client for the Notion databases API.
#[derive(Clone)]
pub struct NotionClient {
    inner: Arc<NotionClientInner>,
}

struct NotionClientInner {
    client: reqwest::Client,
    api_base: String,
    version: String,
    api_key: Option<SecretString>,
    products_database: Option<String>,
    variants_database: Option<String>,
    /// Public storefront URL used to rewrite development image links.
    base_url: String,
}

impl NotionClient {
    /// Create a new Notion client.
    #[must_use]
    pub fn new(config: &NotionConfig, base_url: &str) -> Self {
        Self {
            inner: Arc::new(NotionClientInner {
                client: reqwest::Client::new(),
                api_base: config.api_base.clone(),
                version: config.version.clone(),
                api_key: config.api_key.clone(),
                products_database: config.products_database_id.clone(),
                variants_database: config.variants_database_id.clone(),
                base_url: base_url.to_string(),
            }),
        }
    }

    /// API key and products database are both set.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner.api_key.is_some() && self.inner.products_database.is_some()
    }

    /// Products database id.
    ///
    /// # Errors
    ///
    /// `NotConfigured` when unset.
    pub fn products_database(&self) -> Result<&str, NotionError> {
        self.inner
            .products_database
            .as_deref()
            .ok_or(NotionError::NotConfigured)
    }

    #[must_use]
    pub fn variants_database(&self) -> Option<&str> {
        self.inner.variants_database.as_deref()
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<String, NotionError> {
        let api_key = self
            .inner
            .api_key
            .as_ref()
            .ok_or(NotionError::NotConfigured)?;

        let mut request = self
            .inner
            .client
            .request(method, format!("{}{path}", self.inner.api_base))
            .bearer_auth(api_key.expose_secret())
            .header("Notion-Version", &self.inner.version);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %text.chars().take(500).collect::<String>(),
                "Notion API returned non-success status"
            );
            return Err(NotionError::Api {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }

        Ok(text)
    }

    /// Every page of a database matching `filter`, following cursors.
    ///
    /// # Errors
    ///
    /// Returns `NotionError` if the request fails or Notion rejects it.
    #[instrument(skip(self, filter))]
    pub async fn query_database(
        &self,
        database_id: &str,
        filter: Option<Value>,
    ) -> Result<Vec<Page>, NotionError> {
        let path = format!("/databases/{database_id}/query");
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "page_size": PAGE_SIZE });
            if let Some(filter) = &filter {
                body["filter"] = filter.clone();
            }
            if let Some(cursor) = &cursor {
                body["start_cursor"] = Value::String(cursor.clone());
            }

            let text = self.execute(Method::POST, &path, Some(&body)).await?;
            let response: QueryResponse = serde_json::from_str(&text)?;
            pages.extend(response.results);

            match response.next_cursor {
                Some(next) if response.has_more => cursor = Some(next),
                _ => break,
            }
        }

        debug!(count = pages.len(), "Queried Notion database");
        Ok(pages)
    }

    /// Create a page in a database and return its id.
    ///
    /// # Errors
    ///
    /// Returns `NotionError` if the request fails or Notion rejects it.
    #[instrument(skip(self, properties))]
    pub async fn create_page(
        &self,
        database_id: &str,
        properties: Value,
    ) -> Result<String, NotionError> {
        let body = json!({ "parent": { "database_id": database_id }, "properties": properties });
        let text = self.execute(Method::POST, "/pages", Some(&body)).await?;
        let page: Page = serde_json::from_str(&text)?;
        Ok(page.id)
    }

    /// Update properties of an existing page.
    ///
    /// # Errors
    ///
    /// Returns `NotionError` if the request fails or Notion rejects it.
    #[instrument(skip(self, properties))]
    pub async fn update_page(&self, page_id: &str, properties: Value) -> Result<(), NotionError> {
        let body = json!({ "properties": properties });
        self.execute(Method::PATCH, &format!("/pages/{page_id}"), Some(&body))
            .await?;
        Ok(())
    }

    /// Products-database page for a product, by `ID` then by `SKU`.
    ///
    /// # Errors
    ///
    /// Returns `NotionError` if a query fails.
    pub async fn find_product_page(
        &self,
        product_id: &str,
        sku: &str,
    ) -> Result<Option<Page>, NotionError> {
        let database = self.products_database()?.to_string();

        for (property, value) in [("ID", product_id), ("SKU", sku)] {
            if value.is_empty() {
                continue;
            }
            let filter = json!({ "property": property, "rich_text": { "equals": value } });
            let mut pages = self.query_database(&database, Some(filter)).await?;
            if !pages.is_empty() {
                return Ok(Some(pages.swap_remove(0)));
            }
        }

        Ok(None)
    }

    /// Images stored for a product. A product with no page has no images.
    ///
    /// # Errors
    ///
    /// Returns `NotionError` if the lookup fails.
    #[instrument(skip(self))]
    pub async fn product_images(
        &self,
        product_id: &str,
        sku: &str,
    ) -> Result<ProductImages, NotionError> {
        let Some(page) = self.find_product_page(product_id, sku).await? else {
            debug!("No Notion page for product");
            return Ok(ProductImages::default());
        };
        Ok(self.images_from_properties(&page.properties))
    }

    /// Extract `Images` / `Detail Image` with development URLs rewritten.
    #[must_use]
    pub fn images_from_properties(&self, props: &Map<String, Value>) -> ProductImages {
        let fix = |url: String| fix_image_url(&url, &self.inner.base_url);
        ProductImages {
            images: properties::files(props, "Images")
                .into_iter()
                .map(fix)
                .collect(),
            detail_image: properties::files(props, "Detail Image")
                .into_iter()
                .next()
                .map(fix),
        }
    }

    /// Write a product's images, updating its page or creating one linked by
    /// `ID` and `SKU`. Relative paths are made absolute against the public
    /// base URL and placeholder images are skipped.
    ///
    /// # Errors
    ///
    /// Returns `NotionError` if a lookup or write fails.
    #[instrument(skip(self, images, detail_image))]
    pub async fn sync_product_images(
        &self,
        product_id: &str,
        sku: &str,
        images: &[String],
        detail_image: Option<&str>,
    ) -> Result<(), NotionError> {
        let base = &self.inner.base_url;
        let images: Vec<String> = images
            .iter()
            .filter(|url| !url.is_empty() && !url.contains("placeholder.png"))
            .map(|url| absolute_image_url(url, base))
            .collect();
        let detail = detail_image.map(|url| absolute_image_url(url, base));

        let mut props = Map::new();
        if !images.is_empty() {
            props.insert("Images".to_string(), properties::files_value(&images));
        }
        if let Some(detail) = detail {
            props.insert("Detail Image".to_string(), properties::files_value(&[detail]));
        }

        if let Some(page) = self.find_product_page(product_id, sku).await? {
            self.update_page(&page.id, Value::Object(props)).await?;
            debug!(page_id = %page.id, "Updated Notion image page");
        } else {
            props.insert("ID".to_string(), properties::rich_text_value(product_id));
            props.insert("SKU".to_string(), properties::rich_text_value(sku));
            props.insert(
                "Title".to_string(),
                properties::title_value(&format!("Image record for {product_id}")),
            );
            props.insert("Status".to_string(), properties::select_value("Active"));
            let database = self.products_database()?.to_string();
            let page_id = self.create_page(&database, Value::Object(props)).await?;
            debug!(page_id = %page_id, "Created Notion image page");
        }

        Ok(())
    }
}

/// Replace `http(s)://localhost:3000` with the public base URL.
#[must_use]
pub fn fix_image_url(url: &str, base_url: &str) -> String {
    for prefix in ["http://localhost:3000", "https://localhost:3000"] {
        if let Some(rest) = url.strip_prefix(prefix) {
            return format!("{base_url}{rest}");
        }
    }
    url.to_string()
}

fn absolute_image_url(url: &str, base_url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else if url.starts_with('/') {
        format!("{base_url}{url}")
    } else {
        format!("{base_url}/images/{url}")
    }
}
