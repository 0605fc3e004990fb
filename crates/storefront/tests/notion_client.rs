//! Integration tests for `NotionClient` against a local mock server.

use std::collections::HashMap;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use protocol_zero_storefront::config::StorefrontConfig;
use protocol_zero_storefront::notion::{NotionClient, NotionError, ProductImages};

const BASE_URL: &str = "https://pzairsoft.ca";

fn test_client(server: &MockServer) -> NotionClient {
    let vars: HashMap<&str, String> = HashMap::from([
        ("NOTION_API_BASE", server.uri()),
        ("NOTION_API_KEY", "secret_notion".to_string()),
        ("NOTION_DATABASE_ID_PRODUCTS", "db-products".to_string()),
        ("STOREFRONT_BASE_URL", BASE_URL.to_string()),
    ]);
    let config = StorefrontConfig::from_lookup(&|key| vars.get(key).cloned())
        .expect("failed to build test config");
    NotionClient::new(&config.notion, &config.base_url)
}

fn image_page(id: &str, url: &str) -> serde_json::Value {
    json!({
        "id": id,
        "properties": {
            "Images": { "files": [{ "external": { "url": url } }] },
            "Detail Image": { "files": [{ "file": { "url": "https://files.notion.so/detail.png" } }] }
        }
    })
}

// ---------------------------------------------------------------------------
// Database queries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn query_database_follows_cursors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/databases/db-products/query"))
        .and(header("Notion-Version", "2022-06-28"))
        .and(header("Authorization", "Bearer secret_notion"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "id": "p1", "properties": {} }],
            "has_more": true,
            "next_cursor": "c2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/databases/db-products/query"))
        .and(body_partial_json(json!({ "start_cursor": "c2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "id": "p2", "properties": {} }],
            "has_more": false,
            "next_cursor": null
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    let pages = test_client(&server)
        .query_database("db-products", None)
        .await
        .expect("query should succeed");

    let ids: Vec<&str> = pages.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["p1", "p2"]);
}

#[tokio::test]
async fn query_database_surfaces_api_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/databases/db-products/query"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let result = test_client(&server).query_database("db-products", None).await;
    assert!(
        matches!(result, Err(NotionError::Api { status: 401, .. })),
        "expected Api 401, got: {result:?}"
    );
}

// ---------------------------------------------------------------------------
// Product images
// ---------------------------------------------------------------------------

#[tokio::test]
async fn product_images_falls_back_to_sku_and_rewrites_dev_urls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/databases/db-products/query"))
        .and(body_partial_json(json!({ "filter": { "property": "ID" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/databases/db-products/query"))
        .and(body_partial_json(json!({
            "filter": { "property": "SKU", "rich_text": { "equals": "PZ-M4" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [image_page("page-1", "http://localhost:3000/images/m4.jpg")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let images = test_client(&server)
        .product_images("prod-1", "PZ-M4")
        .await
        .expect("lookup should succeed");

    assert_eq!(
        images,
        ProductImages {
            images: vec![format!("{BASE_URL}/images/m4.jpg")],
            detail_image: Some("https://files.notion.so/detail.png".to_string()),
        }
    );
}

#[tokio::test]
async fn product_images_without_page_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/databases/db-products/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&server)
        .await;

    let images = test_client(&server)
        .product_images("prod-1", "PZ-M4")
        .await
        .expect("lookup should succeed");
    assert_eq!(images, ProductImages::default());
}

// ---------------------------------------------------------------------------
// Image sync
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sync_product_images_creates_page_when_missing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/databases/db-products/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/pages"))
        .and(body_partial_json(json!({
            "parent": { "database_id": "db-products" },
            "properties": {
                "Images": { "files": [{ "external": { "url": format!("{BASE_URL}/images/m4.jpg") } }] },
                "ID": { "rich_text": [{ "text": { "content": "prod-1" } }] }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "new-page" })))
        .expect(1)
        .mount(&server)
        .await;

    test_client(&server)
        .sync_product_images(
            "prod-1",
            "PZ-M4",
            &["m4.jpg".to_string(), "/images/placeholder.png".to_string()],
            None,
        )
        .await
        .expect("sync should succeed");
}

#[tokio::test]
async fn sync_product_images_updates_existing_page() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/databases/db-products/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [image_page("page-1", "https://cdn.test/old.jpg")]
        })))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/pages/page-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "page-1" })))
        .expect(1)
        .mount(&server)
        .await;

    test_client(&server)
        .sync_product_images("prod-1", "PZ-M4", &["https://cdn.test/new.jpg".to_string()], None)
        .await
        .expect("sync should succeed");
}
