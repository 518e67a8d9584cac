//! Integration tests for admin panel page flows.
//!
//! The admin panel is served on an ephemeral port and talks to a fake backend.

use axum::http::{Method, StatusCode};
use decor_integration_tests::{FakeBackend, browser, fixtures, spawn_admin};
use reqwest::Client;
use reqwest::header::LOCATION;
use serde_json::json;

fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Sign in as the fixture admin and return the cookie-holding client.
async fn signed_in(backend: &FakeBackend, base_url: &str) -> Client {
    backend.login_as(fixtures::admin(), "token=admin");
    let client = browser();
    let resp = client
        .post(format!("{base_url}/auth/login"))
        .form(&[("email", "ops@example.com"), ("password", "correct-horse")])
        .send()
        .await
        .expect("login request succeeds");
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/");
    client
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_dashboard_requires_sign_in() {
    let backend = FakeBackend::start().await;
    let base_url = spawn_admin(&backend).await;

    let resp = browser()
        .get(format!("{base_url}/"))
        .send()
        .await
        .expect("request succeeds");
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/auth/login");
}

#[tokio::test]
async fn test_customer_account_is_refused() {
    let backend = FakeBackend::start().await;
    backend.login_as(fixtures::customer(), "token=customer");
    let base_url = spawn_admin(&backend).await;
    let client = browser();

    let resp = client
        .post(format!("{base_url}/auth/login"))
        .form(&[("email", "mina@example.com"), ("password", "hunter22")])
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("body");
    assert!(body.contains("This account does not have admin access."));

    // Nothing was stored in the panel session
    let resp = client
        .get(format!("{base_url}/"))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(location(&resp), "/auth/login");
}

#[tokio::test]
async fn test_expired_backend_session_sends_admin_to_sign_in() {
    let backend = FakeBackend::start().await;
    let base_url = spawn_admin(&backend).await;
    let client = signed_in(&backend, &base_url).await;
    backend.respond(
        Method::GET,
        "/api/order",
        StatusCode::UNAUTHORIZED,
        json!({"success": false, "message": "Session expired"}),
    );

    let resp = client
        .get(format!("{base_url}/"))
        .send()
        .await
        .expect("request succeeds");
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/auth/login");
}

// ============================================================================
// Dashboard
// ============================================================================

#[tokio::test]
async fn test_dashboard_lists_pending_orders_and_low_stock() {
    let backend = FakeBackend::start().await;
    backend.ok(
        Method::GET,
        "/api/order",
        json!({"success": true, "data": [
            fixtures::order("o1", "pending", 129.0, "2026-10-01T10:00:00Z"),
            fixtures::order("o2", "delivered", 58.0, "2026-09-20T09:30:00Z"),
        ]}),
    );
    backend.ok(
        Method::GET,
        "/api/product",
        json!({"success": true, "products": [
            fixtures::product("p1", "Oak Side Table", 129.0, 40),
            fixtures::product("p2", "Linen Throw", 58.0, 2),
        ], "total": 2}),
    );
    let base_url = spawn_admin(&backend).await;
    let client = signed_in(&backend, &base_url).await;

    let resp = client
        .get(format!("{base_url}/"))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("body");
    assert!(body.contains("Dashboard"));
    assert!(body.contains("#ORD-o1"), "pending order is listed");
    assert!(!body.contains("#ORD-o2"), "delivered order is not pending");
    assert!(body.contains("Linen Throw"), "low-stock product is listed");
    assert!(!body.contains("Oak Side Table</a>"), "well-stocked product is not");

    let orders = backend.last_request(&Method::GET, "/api/order");
    assert_eq!(orders.cookie.as_deref(), Some("token=admin"));
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
async fn test_status_change_is_sent_to_backend() {
    let backend = FakeBackend::start().await;
    backend.ok(
        Method::PUT,
        "/api/order/o1/status",
        json!({"success": true, "data": fixtures::order("o1", "shipped", 129.0, "2026-10-01T10:00:00Z")}),
    );
    let base_url = spawn_admin(&backend).await;
    let client = signed_in(&backend, &base_url).await;

    let resp = client
        .post(format!("{base_url}/orders/o1/status"))
        .form(&[("status", "shipped")])
        .send()
        .await
        .expect("request succeeds");
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/orders/o1");

    let update = backend.last_request(&Method::PUT, "/api/order/o1/status");
    assert_eq!(update.body, json!({"status": "shipped"}));
    assert_eq!(update.cookie.as_deref(), Some("token=admin"));
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let backend = FakeBackend::start().await;
    let base_url = spawn_admin(&backend).await;
    let client = signed_in(&backend, &base_url).await;

    let resp = client
        .get(format!("{base_url}/orders/missing"))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
