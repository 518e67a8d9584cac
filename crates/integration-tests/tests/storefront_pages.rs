//! Integration tests for storefront page flows.
//!
//! The storefront is served on an ephemeral port and talks to a fake backend.

use axum::http::{Method, StatusCode};
use decor_integration_tests::{FakeBackend, browser, fixtures, spawn_storefront};
use reqwest::header::LOCATION;
use serde_json::json;

fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health() {
    let backend = FakeBackend::start().await;
    let base_url = spawn_storefront(&backend).await;

    let resp = browser()
        .get(format!("{base_url}/health"))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("body"), "ok");
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_bad_credentials_rerender_login() {
    let backend = FakeBackend::start().await;
    backend.respond(
        Method::POST,
        "/api/auth/login",
        StatusCode::UNAUTHORIZED,
        json!({"success": false, "message": "Invalid credentials"}),
    );
    let base_url = spawn_storefront(&backend).await;

    let resp = browser()
        .post(format!("{base_url}/auth/login"))
        .form(&[("email", "mina@example.com"), ("password", "wrong")])
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("body");
    assert!(body.contains("Invalid email or password."));
    assert!(body.contains("mina@example.com"), "email is kept in the form");
}

#[tokio::test]
async fn test_cart_requires_sign_in() {
    let backend = FakeBackend::start().await;
    let base_url = spawn_storefront(&backend).await;

    let resp = browser()
        .post(format!("{base_url}/cart/add"))
        .form(&[("product_id", "p1"), ("quantity", "1")])
        .send()
        .await
        .expect("request succeeds");
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/auth/login");
    assert!(backend.requests_to(&Method::POST, "/api/cart").is_empty());
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
async fn test_add_to_cart_forwards_session_and_refetches() {
    let backend = FakeBackend::start().await;
    backend.login_as(fixtures::customer(), "token=abc123");
    backend.ok(Method::POST, "/api/cart", json!({"success": true}));
    let table = fixtures::product("p1", "Oak Side Table", 129.0, 4);
    backend.ok(Method::GET, "/api/cart", fixtures::cart(&[("line1", table, 2)]));
    let base_url = spawn_storefront(&backend).await;
    let client = browser();

    let resp = client
        .post(format!("{base_url}/auth/login"))
        .form(&[("email", "mina@example.com"), ("password", "hunter22")])
        .send()
        .await
        .expect("login request succeeds");
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/");
    let fetches_after_login = backend.requests_to(&Method::GET, "/api/cart").len();

    let resp = client
        .post(format!("{base_url}/cart/add"))
        .form(&[("product_id", "p1"), ("quantity", "2"), ("redirect", "/cart")])
        .send()
        .await
        .expect("add request succeeds");
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/cart");

    let add = backend.last_request(&Method::POST, "/api/cart");
    assert_eq!(add.body, json!({"productId": "p1", "quantity": 2}));
    assert_eq!(add.cookie.as_deref(), Some("token=abc123"));

    let fetches = backend.requests_to(&Method::GET, "/api/cart");
    assert_eq!(fetches.len(), fetches_after_login + 1, "cart is refetched after adding");
    assert!(fetches.iter().all(|r| r.cookie.as_deref() == Some("token=abc123")));
}

#[tokio::test]
async fn test_add_to_cart_rejects_bad_quantity_without_calling_backend() {
    let backend = FakeBackend::start().await;
    backend.login_as(fixtures::customer(), "token=abc123");
    backend.ok(Method::GET, "/api/cart", fixtures::cart(&[]));
    let base_url = spawn_storefront(&backend).await;
    let client = browser();

    client
        .post(format!("{base_url}/auth/login"))
        .form(&[("email", "mina@example.com"), ("password", "hunter22")])
        .send()
        .await
        .expect("login request succeeds");

    let resp = client
        .post(format!("{base_url}/cart/add"))
        .form(&[("product_id", "p1"), ("quantity", "0"), ("redirect", "/cart")])
        .send()
        .await
        .expect("add request succeeds");
    assert!(resp.status().is_redirection());
    assert!(backend.requests_to(&Method::POST, "/api/cart").is_empty());
}

#[tokio::test]
async fn test_sign_in_is_throttled_but_sign_out_is_not() {
    let backend = FakeBackend::start().await;
    let base_url = spawn_storefront(&backend).await;
    let client = browser();

    for _ in 0..8 {
        let resp = client
            .post(format!("{base_url}/auth/logout"))
            .send()
            .await
            .expect("logout request succeeds");
        assert!(resp.status().is_redirection(), "logout answered {}", resp.status());
    }

    let mut throttled = false;
    for _ in 0..8 {
        let resp = client
            .get(format!("{base_url}/auth/login"))
            .send()
            .await
            .expect("login page request succeeds");
        throttled |= resp.status() == StatusCode::TOO_MANY_REQUESTS;
    }
    assert!(throttled, "login page is rate limited");
}

// ============================================================================
// Coupons
// ============================================================================

#[tokio::test]
async fn test_coupon_code_format_is_checked_before_backend() {
    let backend = FakeBackend::start().await;
    backend.login_as(fixtures::customer(), "token=abc123");
    let table = fixtures::product("p1", "Oak Side Table", 129.0, 4);
    backend.ok(Method::GET, "/api/cart", fixtures::cart(&[("line1", table, 1)]));
    backend.respond(
        Method::POST,
        "/api/coupons/apply",
        StatusCode::BAD_REQUEST,
        json!({"success": false, "message": "Coupon has expired"}),
    );
    let base_url = spawn_storefront(&backend).await;
    let client = browser();

    client
        .post(format!("{base_url}/auth/login"))
        .form(&[("email", "mina@example.com"), ("password", "hunter22")])
        .send()
        .await
        .expect("login request succeeds");

    let resp = client
        .post(format!("{base_url}/checkout/coupon"))
        .form(&[("code", "no way!")])
        .send()
        .await
        .expect("coupon request succeeds");
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/checkout");
    assert!(
        backend.requests_to(&Method::POST, "/api/coupons/apply").is_empty(),
        "malformed code is refused locally"
    );

    // A well-formed code is left to the backend, whose refusal is not fatal
    let resp = client
        .post(format!("{base_url}/checkout/coupon"))
        .form(&[("code", "old10")])
        .send()
        .await
        .expect("coupon request succeeds");
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/checkout");

    let apply = backend.last_request(&Method::POST, "/api/coupons/apply");
    assert_eq!(apply.body["code"], "OLD10");
    assert_eq!(apply.body["cartTotal"], 129.0);
    assert_eq!(apply.cookie.as_deref(), Some("token=abc123"));
}
