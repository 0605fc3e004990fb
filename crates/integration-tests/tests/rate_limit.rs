//! Rate limiting with the limiter layers switched on.

use axum::http::{Method, StatusCode};
use protocol_zero_integration_tests::{TestApp, checkout_body};

fn limited_app() -> TestApp {
    TestApp::with_vars(&[("RATE_LIMIT_ENABLED", "true")])
}

#[tokio::test]
async fn test_direct_clients_are_keyed_by_peer_address() {
    let app = limited_app();
    let response = app.get("/api/products").await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
}

#[tokio::test]
async fn test_proxied_clients_are_keyed_by_header() {
    let app = limited_app();
    let response = app
        .request(
            Method::GET,
            "/api/products",
            &[("x-forwarded-for", "198.51.100.2, 10.0.0.1")],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_exhausted_checkout_budget_is_json_429() {
    let app = limited_app();
    let mut statuses = Vec::new();
    let mut last = None;
    for _ in 0..8 {
        let response = app.post_json("/api/checkout", &checkout_body()).await;
        statuses.push(response.status);
        last = Some(response);
    }

    assert_eq!(statuses[0], StatusCode::OK);
    let limited = last.expect("at least one response");
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS, "{statuses:?}");
    assert_eq!(limited.error(), Some("Too many requests"));
    assert!(limited.header("retry-after").is_some());
}

#[tokio::test]
async fn test_budgets_are_per_client() {
    let app = limited_app();
    for _ in 0..8 {
        app.post_json("/api/checkout", &checkout_body()).await;
    }

    let other_client = app
        .request(
            Method::POST,
            "/api/checkout",
            &[("cf-connecting-ip", "203.0.113.7")],
            Some(&checkout_body()),
        )
        .await;
    assert_eq!(other_client.status, StatusCode::OK);
}
