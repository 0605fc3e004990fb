//! Admin order API: authorization, listing and lifecycle actions.

use axum::http::{Method, StatusCode};
use protocol_zero_integration_tests::{ADMIN_EMAIL, TestApp, admin_headers};
use serde_json::{Value, json};

/// Place an order and return its storage id.
async fn placed_order(app: &TestApp) -> String {
    let body = app.place_order().await;
    body["orderId"].as_str().expect("order id").to_string()
}

async fn order_detail(app: &TestApp, id: &str) -> Value {
    let response = app.admin_get(&format!("/api/admin/orders/{id}")).await;
    assert_eq!(response.status, StatusCode::OK);
    response.body["order"].clone()
}

// =============================================================================
// Authorization
// =============================================================================

#[tokio::test]
async fn test_missing_identity_is_401() {
    let app = TestApp::new();

    let anonymous = app.get("/api/admin/orders").await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.error(), Some("Unauthorized"));

    let no_email = app
        .request(
            Method::GET,
            "/api/admin/orders",
            &[("authorization", "Bearer id-token"), ("x-user-id", "uid_1")],
            None,
        )
        .await;
    assert_eq!(no_email.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_admin_is_403() {
    let app = TestApp::new();
    let response = app
        .request(
            Method::GET,
            "/api/admin/orders",
            &admin_headers("shopper@pzairsoft.ca"),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error(), Some("Forbidden"));
}

#[tokio::test]
async fn test_admin_email_match_ignores_case() {
    let app = TestApp::new();
    let response = app
        .request(
            Method::GET,
            "/api/admin/orders",
            &admin_headers(&ADMIN_EMAIL.to_uppercase()),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_empty_allow_list_refuses_everyone() {
    let app = TestApp::with_vars(&[("ADMIN_EMAILS", "")]);
    let response = app.admin_get("/api/admin/orders").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_list_and_filter() {
    let app = TestApp::new();
    let first = placed_order(&app).await;
    placed_order(&app).await;

    let all = app.admin_get("/api/admin/orders").await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body["orders"].as_array().map(Vec::len), Some(2));

    app.admin_patch(
        &format!("/api/admin/orders/{first}"),
        &json!({ "action": "markPaid" }),
    )
    .await;

    let paid = app.admin_get("/api/admin/orders?status=paid").await;
    let orders = paid.body["orders"].as_array().expect("order array");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], first.as_str());

    let limited = app.admin_get("/api/admin/orders?pageSize=1").await;
    assert_eq!(limited.body["orders"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_unknown_status_filter_is_400() {
    let app = TestApp::new();
    let response = app.admin_get("/api/admin/orders?status=teleported").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), Some("Unknown status: teleported"));
}

#[tokio::test]
async fn test_unknown_order_is_404() {
    let app = TestApp::new();
    let response = app.admin_get("/api/admin/orders/rec_404").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let patch = app
        .admin_patch("/api/admin/orders/rec_404", &json!({ "action": "cancel" }))
        .await;
    assert_eq!(patch.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Lifecycle actions
// =============================================================================

#[tokio::test]
async fn test_mark_paid() {
    let app = TestApp::new();
    let id = placed_order(&app).await;
    let before = order_detail(&app, &id).await;
    let history_before = before["statusHistory"].as_array().map(Vec::len).unwrap_or_default();

    let response = app
        .admin_patch(
            &format!("/api/admin/orders/{id}"),
            &json!({ "action": "markPaid", "payload": { "etransferRef": "CA1234" } }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["ok"], true);
    assert_eq!(response.body["status"], "paid");
    assert_eq!(response.body["version"], 2);

    let after = order_detail(&app, &id).await;
    assert_eq!(after["status"], "paid");
    assert_eq!(after["payment"]["status"], "paid");
    assert_eq!(after["payment"]["etransferRef"], "CA1234");
    assert!(after["payment"]["receivedAt"].is_string());

    let history = after["statusHistory"].as_array().expect("history array");
    assert_eq!(history.len(), history_before + 1);
    assert_eq!(history.last().map(|h| &h["status"]), Some(&json!("paid")));
}

#[tokio::test]
async fn test_illegal_transition_is_409_and_nothing_changes() {
    let app = TestApp::new();
    let id = placed_order(&app).await;

    let response = app
        .admin_patch(
            &format!("/api/admin/orders/{id}"),
            &json!({ "action": "markShipped", "payload": { "shipping": { "carrier": "Canada Post" } } }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let order = order_detail(&app, &id).await;
    assert_eq!(order["status"], "placed");
    assert_eq!(order["version"], 1);
    assert_eq!(order["statusHistory"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_terminal_orders_reject_actions() {
    let app = TestApp::new();
    let id = placed_order(&app).await;
    let uri = format!("/api/admin/orders/{id}");

    let cancelled = app.admin_patch(&uri, &json!({ "action": "cancel" })).await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.body["status"], "cancelled");

    let again = app.admin_patch(&uri, &json!({ "action": "complete" })).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_stale_expected_version_is_409() {
    let app = TestApp::new();
    let id = placed_order(&app).await;
    let uri = format!("/api/admin/orders/{id}");

    let first = app
        .admin_patch(&uri, &json!({ "action": "markPaid", "expectedVersion": 1 }))
        .await;
    assert_eq!(first.status, StatusCode::OK);

    // A second admin still looking at version 1
    let stale = app
        .admin_patch(&uri, &json!({ "action": "setPurchasing", "expectedVersion": 1 }))
        .await;
    assert_eq!(stale.status, StatusCode::CONFLICT);
    assert_eq!(order_detail(&app, &id).await["status"], "paid");
}

#[tokio::test]
async fn test_actor_is_recorded_from_identity() {
    let app = TestApp::new();
    let id = placed_order(&app).await;

    app.admin_patch(
        &format!("/api/admin/orders/{id}"),
        &json!({ "action": "markPaid", "payload": { "actorId": "spoofed" } }),
    )
    .await;

    let order = order_detail(&app, &id).await;
    let last = order["statusHistory"]
        .as_array()
        .and_then(|h| h.last())
        .cloned()
        .expect("history entry");
    assert_eq!(last["actorId"], "uid_admin");
}

#[tokio::test]
async fn test_bad_action_requests_are_400() {
    let app = TestApp::new();
    let id = placed_order(&app).await;
    let uri = format!("/api/admin/orders/{id}");

    let unknown = app.admin_patch(&uri, &json!({ "action": "teleport" })).await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

    let missing_payload = app
        .admin_patch(&uri, &json!({ "action": "schedulePickup" }))
        .await;
    assert_eq!(missing_payload.status, StatusCode::BAD_REQUEST);

    let not_json = app
        .request(
            Method::PATCH,
            &uri,
            &[
                ("authorization", "Bearer id-token"),
                ("x-user-email", ADMIN_EMAIL),
                ("x-user-id", "uid_admin"),
                ("content-type", "application/json"),
            ],
            None,
        )
        .await;
    assert_eq!(not_json.status, StatusCode::BAD_REQUEST);
    assert_eq!(not_json.error(), Some("Invalid JSON body"));
}
