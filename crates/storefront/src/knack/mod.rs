//! Knack record store REST client.
//!
//! Knack is the system of record for products, variants, users, orders and
//! promo codes. Records are flat JSON objects keyed by `field_N`; the mapping
//! from logical fields lives in [`crate::config::KnackFields`] and the value
//! coercions in [`fields`].
//!
//! Credentials are optional at startup. Every call made without them fails
//! with [`KnackError::NotConfigured`].

pub mod fields;

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::KnackConfig;

/// A raw Knack record.
pub type Record = Map<String, Value>;

/// Rows fetched per page when walking every page of an object.
const MAX_ROWS_PER_PAGE: u32 = 1000;

/// Errors that can occur when talking to Knack.
#[derive(Debug, Error)]
pub enum KnackError {
    /// Application id or API key missing.
    #[error("Knack is not configured (set KNACK_APPLICATION_ID and KNACK_REST_API_KEY)")]
    NotConfigured,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Knack answered with a non-success status.
    #[error("Knack API error {status}: {body}")]
    Api { status: u16, body: String },
}

/// Sort direction for record listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Listing options for [`KnackClient::get_records`].
///
/// Without a page every page is fetched; with one, only that page is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    filters: Vec<(String, String)>,
    sort: Option<(String, SortOrder)>,
    page: Option<u32>,
    rows_per_page: Option<u32>,
}

impl RecordQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`. Rules are combined with `and`.
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    #[must_use]
    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    /// Fetch a single page of `rows_per_page` records.
    #[must_use]
    pub const fn page(mut self, page: u32, rows_per_page: u32) -> Self {
        self.page = Some(page);
        self.rows_per_page = Some(rows_per_page);
        self
    }

    /// Knack's filter document: `{"match":"and","rules":[...]}`.
    fn filters_json(&self) -> Option<String> {
        if self.filters.is_empty() {
            return None;
        }
        let rules: Vec<Value> = self
            .filters
            .iter()
            .map(|(field, value)| json!({ "field": field, "operator": "is", "value": value }))
            .collect();
        Some(json!({ "match": "and", "rules": rules }).to_string())
    }

    fn params(&self, page: u32, rows_per_page: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", page.to_string()),
            ("rows_per_page", rows_per_page.to_string()),
        ];
        if let Some((field, order)) = &self.sort {
            params.push(("sort_field", field.clone()));
            params.push(("sort_order", order.as_str().to_string()));
        }
        if let Some(filters) = self.filters_json() {
            params.push(("filters", filters));
        }
        params
    }
}

#[derive(Debug, Deserialize)]
struct RecordPage {
    #[serde(default)]
    records: Vec<Record>,
    #[serde(default)]
    total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    id: String,
}

// =============================================================================
// KnackClient
// =============================================================================

/// Client for the Knack object records API.
#[derive(Clone)]
pub struct KnackClient {
    inner: Arc<KnackClientInner>,
}

struct KnackClientInner {
    client: reqwest::Client,
    api_base: String,
    credentials: Option<Credentials>,
}

struct Credentials {
    application_id: String,
    api_key: SecretString,
}

impl KnackClient {
    /// Create a new Knack client.
    #[must_use]
    pub fn new(config: &KnackConfig) -> Self {
        let credentials = match (&config.application_id, &config.api_key) {
            (Some(application_id), Some(api_key)) => Some(Credentials {
                application_id: application_id.clone(),
                api_key: api_key.clone(),
            }),
            _ => None,
        };

        Self {
            inner: Arc::new(KnackClientInner {
                client: reqwest::Client::new(),
                api_base: config.api_base.clone(),
                credentials,
            }),
        }
    }

    /// Whether credentials are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner.credentials.is_some()
    }

    fn records_url(&self, object: &str) -> String {
        format!("{}/objects/{object}/records", self.inner.api_base)
    }

    /// Send a request and return the raw body of a successful response.
    async fn execute(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<String, KnackError> {
        let credentials = self
            .inner
            .credentials
            .as_ref()
            .ok_or(KnackError::NotConfigured)?;

        let mut request = self
            .inner
            .client
            .request(method, url)
            .header("X-Knack-Application-Id", &credentials.application_id)
            .header("X-Knack-REST-API-Key", credentials.api_key.expose_secret())
            .query(params);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if status != StatusCode::NOT_FOUND {
                tracing::error!(
                    status = %status,
                    body = %text.chars().take(500).collect::<String>(),
                    "Knack API returned non-success status"
                );
            }
            return Err(KnackError::Api {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }

        Ok(text)
    }

    async fn fetch_page(
        &self,
        object: &str,
        query: &RecordQuery,
        page: u32,
        rows_per_page: u32,
    ) -> Result<RecordPage, KnackError> {
        let text = self
            .execute(
                Method::GET,
                &self.records_url(object),
                &query.params(page, rows_per_page),
                None,
            )
            .await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// List records of `object`.
    ///
    /// # Errors
    ///
    /// Returns `KnackError` if the request fails or Knack rejects it.
    #[instrument(skip(self, query), fields(object = %object))]
    pub async fn get_records(
        &self,
        object: &str,
        query: &RecordQuery,
    ) -> Result<Vec<Record>, KnackError> {
        if let Some(page) = query.page {
            let rows = query.rows_per_page.unwrap_or(MAX_ROWS_PER_PAGE);
            let data = self.fetch_page(object, query, page, rows).await?;
            debug!(count = data.records.len(), page, "Fetched Knack page");
            return Ok(data.records);
        }

        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let data = self
                .fetch_page(object, query, page, MAX_ROWS_PER_PAGE)
                .await?;
            let fetched = data.records.len();
            records.extend(data.records);

            let total_pages = data.total_pages.unwrap_or(1);
            debug!(page, total_pages, fetched, "Fetched Knack page");
            if page >= total_pages || fetched == 0 {
                break;
            }
            page += 1;
        }

        debug!(count = records.len(), "Fetched all Knack records");
        Ok(records)
    }

    /// Fetch one record by id. A 404 is `None`.
    ///
    /// # Errors
    ///
    /// Returns `KnackError` for any failure other than a 404.
    #[instrument(skip(self), fields(object = %object))]
    pub async fn get_record(&self, object: &str, id: &str) -> Result<Option<Record>, KnackError> {
        let url = format!("{}/{id}", self.records_url(object));
        let text = match self.execute(Method::GET, &url, &[], None).await {
            Ok(text) => text,
            Err(KnackError::Api { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut value: Record = serde_json::from_str(&text)?;
        // Some endpoints wrap the record as `{ "record": { ... } }`.
        if let Some(Value::Object(record)) = value.remove("record") {
            return Ok(Some(record));
        }
        Ok(Some(value))
    }

    /// Create a record and return its id.
    ///
    /// # Errors
    ///
    /// Returns `KnackError` if the request fails or Knack rejects it.
    #[instrument(skip(self, data), fields(object = %object))]
    pub async fn create_record(&self, object: &str, data: &Value) -> Result<String, KnackError> {
        let text = self
            .execute(Method::POST, &self.records_url(object), &[], Some(data))
            .await?;
        let created: CreatedRecord = serde_json::from_str(&text)?;
        debug!(id = %created.id, "Created Knack record");
        Ok(created.id)
    }

    /// Update fields of an existing record.
    ///
    /// # Errors
    ///
    /// Returns `KnackError` if the request fails or Knack rejects it.
    #[instrument(skip(self, data), fields(object = %object))]
    pub async fn update_record(
        &self,
        object: &str,
        id: &str,
        data: &Value,
    ) -> Result<(), KnackError> {
        let url = format!("{}/{id}", self.records_url(object));
        self.execute(Method::PUT, &url, &[], Some(data)).await?;
        Ok(())
    }

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns `KnackError` if the request fails or Knack rejects it.
    #[instrument(skip(self), fields(object = %object))]
    pub async fn delete_record(&self, object: &str, id: &str) -> Result<(), KnackError> {
        let url = format!("{}/{id}", self.records_url(object));
        self.execute(Method::DELETE, &url, &[], None).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_json_format() {
        let query = RecordQuery::new().filter("field_51", "Active");
        let value: Value = serde_json::from_str(&query.filters_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "match": "and",
                "rules": [{ "field": "field_51", "operator": "is", "value": "Active" }]
            })
        );
    }

    #[test]
    fn test_no_filters_param_without_rules() {
        let params = RecordQuery::new().params(1, 1000);
        assert!(params.iter().all(|(k, _)| *k != "filters"));
        assert!(params.contains(&("rows_per_page", "1000".to_string())));
    }

    #[test]
    fn test_sort_params() {
        let params = RecordQuery::new()
            .sort("field_110", SortOrder::Desc)
            .params(2, 25);
        assert!(params.contains(&("page", "2".to_string())));
        assert!(params.contains(&("sort_field", "field_110".to_string())));
        assert!(params.contains(&("sort_order", "desc".to_string())));
    }

    #[tokio::test]
    async fn test_unconfigured_client_fails_fast() {
        let config = crate::config::StorefrontConfig::from_lookup(&|_| None).unwrap();
        let client = KnackClient::new(&config.knack);
        assert!(!client.is_configured());

        let result = client.get_records("object_6", &RecordQuery::new()).await;
        assert!(matches!(result, Err(KnackError::NotConfigured)));
    }
}
