//! Integration tests for the backend REST client.
//!
//! Each test starts its own fake backend, so they run in parallel.

use axum::http::{Method, StatusCode};
use decor_api::requests::{AddToCart, ApplyCoupon, CreateOrder, ProductQuery, VariationInput};
use decor_api::{AdminApi, ApiError, RestClient, StorefrontApi};
use decor_core::model::Address;
use decor_core::{OrderId, OrderStatus, PaymentMethod, ProductId, VariationId};
use decor_integration_tests::{FakeBackend, TEST_API_KEY, fixtures};
use rust_decimal::Decimal;
use serde_json::json;

fn storefront(backend: &FakeBackend) -> StorefrontApi {
    StorefrontApi::new(RestClient::new(&backend.config()).expect("client builds"))
}

fn admin(backend: &FakeBackend) -> AdminApi {
    AdminApi::new(RestClient::new(&backend.config()).expect("client builds"))
}

// ============================================================================
// Transport
// ============================================================================

#[tokio::test]
async fn test_every_request_carries_api_key() {
    let backend = FakeBackend::start().await;
    backend.ok(
        Method::GET,
        "/api/category",
        json!({"success": true, "data": [{"_id": "c1", "name": "Living", "slug": "living"}]}),
    );

    let api = storefront(&backend);
    let categories = api.categories().await.expect("categories load");
    assert_eq!(categories.len(), 1);

    let request = backend.last_request(&Method::GET, "/api/category");
    assert_eq!(request.api_key.as_deref(), Some(TEST_API_KEY));
    assert!(request.cookie.is_none(), "catalog reads carry no session");
}

#[tokio::test]
async fn test_catalog_reads_are_cached() {
    let backend = FakeBackend::start().await;
    backend.ok(
        Method::GET,
        "/api/product",
        json!({
            "success": true,
            "products": [fixtures::product("p1", "Oak Side Table", 129.0, 4)],
            "total": 1,
        }),
    );

    let api = storefront(&backend);
    let query = ProductQuery {
        category: Some("living".to_string()),
        featured: true,
        ..ProductQuery::default()
    };
    let first = api.products(&query).await.expect("products load");
    let second = api.products(&query).await.expect("products load");
    assert_eq!(first.items.len(), 1);
    assert_eq!(first.total, second.total);

    let requests = backend.requests_to(&Method::GET, "/api/product");
    assert_eq!(requests.len(), 1, "second read is served from cache");
    let query = requests[0].query.clone().unwrap_or_default();
    assert!(query.contains("category=living"));
    assert!(query.contains("isFeatured=true"));
}

#[tokio::test]
async fn test_error_statuses_map_to_api_errors() {
    let backend = FakeBackend::start().await;
    backend.respond(
        Method::GET,
        "/api/auth/me",
        StatusCode::UNAUTHORIZED,
        json!({"success": false, "message": "Not authorized"}),
    );
    backend.respond(
        Method::POST,
        "/api/coupons/apply",
        StatusCode::BAD_REQUEST,
        json!({"success": false, "message": "Coupon has expired"}),
    );
    backend.ok(
        Method::GET,
        "/api/cart",
        json!({"success": false, "message": "Cart is locked"}),
    );

    let api = storefront(&backend);
    let session = decor_api::BackendSession::new("token=stale");

    let err = api.me(&session).await.unwrap_err();
    assert!(err.is_unauthorized());

    let request = ApplyCoupon {
        code: "OLD",
        cart_total: Decimal::from(50),
    };
    match api.apply_coupon(&session, &request).await.unwrap_err() {
        ApiError::Status { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Coupon has expired");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // A 200 carrying success: false is still a failure
    let err = api.cart(&session).await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected(ref message) if message == "Cart is locked"));
    assert!(err.is_client_error());
    assert_eq!(err.user_message(), "Cart is locked");

    let err = api.blog_by_slug("missing").await.unwrap_err();
    assert!(err.is_not_found());
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn test_login_captures_and_forwards_session_cookie() {
    let backend = FakeBackend::start().await;
    backend.login_as(fixtures::customer(), "token=abc123");
    backend.ok(Method::GET, "/api/cart", fixtures::cart(&[]));

    let api = storefront(&backend);
    let login = api.login("mina@example.com", "hunter22").await.expect("login succeeds");
    assert_eq!(login.user.name, "Mina Park");
    assert_eq!(login.session.cookie_header(), "token=abc123");

    let login_request = backend.last_request(&Method::POST, "/api/auth/login");
    assert_eq!(login_request.body["email"], "mina@example.com");

    let cart = api.cart(&login.session).await.expect("cart loads");
    assert!(cart.is_empty());
    let cart_request = backend.last_request(&Method::GET, "/api/cart");
    assert_eq!(cart_request.cookie.as_deref(), Some("token=abc123"));
}

#[tokio::test]
async fn test_login_without_cookie_is_missing_data() {
    let backend = FakeBackend::start().await;
    backend.ok(
        Method::POST,
        "/api/auth/login",
        json!({"success": true, "user": fixtures::customer()}),
    );

    let err = storefront(&backend)
        .login("mina@example.com", "hunter22")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::MissingData));
}

#[tokio::test]
async fn test_sessions_are_not_shared_between_visitors() {
    let backend = FakeBackend::start().await;
    backend.ok(Method::GET, "/api/cart", fixtures::cart(&[]));

    let api = storefront(&backend);
    let first = decor_api::BackendSession::new("token=first");
    let second = decor_api::BackendSession::new("token=second");
    api.cart(&first).await.expect("cart loads");
    api.cart(&second).await.expect("cart loads");

    let cookies: Vec<Option<String>> = backend
        .requests_to(&Method::GET, "/api/cart")
        .into_iter()
        .map(|r| r.cookie)
        .collect();
    assert_eq!(
        cookies,
        [Some("token=first".to_string()), Some("token=second".to_string())]
    );
}

// ============================================================================
// Payloads
// ============================================================================

#[tokio::test]
async fn test_add_to_cart_payload() {
    let backend = FakeBackend::start().await;
    backend.ok(Method::POST, "/api/cart", json!({"success": true}));

    let session = decor_api::BackendSession::new("token=abc");
    let product_id = ProductId::new("p1");
    storefront(&backend)
        .add_to_cart(
            &session,
            &AddToCart {
                product_id: &product_id,
                quantity: 2,
                variation_id: None,
            },
        )
        .await
        .expect("line added");

    let request = backend.last_request(&Method::POST, "/api/cart");
    assert_eq!(request.body, json!({"productId": "p1", "quantity": 2}));
}

#[tokio::test]
async fn test_order_payload_carries_no_amounts() {
    let backend = FakeBackend::start().await;
    backend.ok(
        Method::POST,
        "/api/order",
        json!({"success": true, "data": fixtures::order("o1", "pending", 139.0, "2026-10-01T10:00:00Z")}),
    );

    let address: Address = serde_json::from_value(fixtures::address()).expect("address parses");
    let order = CreateOrder {
        shipping_address: &address,
        billing_address: None,
        payment_method: PaymentMethod::CashOnDelivery,
        coupon_code: Some("SAVE10"),
        notes: None,
    };
    let placed = storefront(&backend)
        .create_order(&decor_api::BackendSession::new("token=abc"), &order)
        .await
        .expect("order placed");
    assert_eq!(placed.reference(), "ORD-o1");

    let body = backend.last_request(&Method::POST, "/api/order").body;
    assert_eq!(body["paymentMethod"], "cash_on_delivery");
    assert_eq!(body["couponCode"], "SAVE10");
    assert_eq!(body["shippingAddress"]["postalCode"], "97201");
    for amount in ["total", "subtotal", "tax", "shippingCost", "discount", "items"] {
        assert!(body.get(amount).is_none(), "order body must not carry {amount}");
    }
}

#[tokio::test]
async fn test_apply_coupon_sends_cart_total() {
    let backend = FakeBackend::start().await;
    backend.ok(
        Method::POST,
        "/api/coupons/apply",
        json!({"success": true, "data": {"code": "SAVE10", "type": "percentage", "value": 10, "discount": 12}}),
    );

    let request = ApplyCoupon {
        code: "SAVE10",
        cart_total: Decimal::new(12050, 2),
    };
    let applied = storefront(&backend)
        .apply_coupon(&decor_api::BackendSession::new("token=abc"), &request)
        .await
        .expect("coupon applies");
    assert_eq!(applied.code, "SAVE10");
    assert_eq!(applied.discount, Some(Decimal::from(12)));

    let body = backend.last_request(&Method::POST, "/api/coupons/apply").body;
    assert_eq!(body["code"], "SAVE10");
    assert_eq!(body["cartTotal"], 120.5);
}

// ============================================================================
// Admin client
// ============================================================================

#[tokio::test]
async fn test_admin_login_refuses_customers_and_ends_their_session() {
    let backend = FakeBackend::start().await;
    backend.login_as(fixtures::customer(), "token=customer");

    let err = admin(&backend)
        .login("mina@example.com", "hunter22")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden));

    let logout = backend.last_request(&Method::POST, "/api/auth/logout");
    assert_eq!(logout.cookie.as_deref(), Some("token=customer"));
}

#[tokio::test]
async fn test_admin_login_accepts_admins() {
    let backend = FakeBackend::start().await;
    backend.login_as(fixtures::admin(), "token=admin");

    let login = admin(&backend)
        .login("ops@example.com", "correct-horse")
        .await
        .expect("admin login succeeds");
    assert!(login.user.is_admin());
    assert!(backend.requests_to(&Method::POST, "/api/auth/logout").is_empty());
}

#[tokio::test]
async fn test_order_status_update_payload() {
    let backend = FakeBackend::start().await;
    backend.ok(
        Method::PUT,
        "/api/order/o1/status",
        json!({"success": true, "data": fixtures::order("o1", "shipped", 139.0, "2026-10-01T10:00:00Z")}),
    );

    let order = admin(&backend)
        .update_order_status(
            &decor_api::BackendSession::new("token=admin"),
            &OrderId::new("o1"),
            &OrderStatus::Shipped,
        )
        .await
        .expect("status updated");
    assert_eq!(order.status, OrderStatus::Shipped);

    let request = backend.last_request(&Method::PUT, "/api/order/o1/status");
    assert_eq!(request.body, json!({"status": "shipped"}));
    assert_eq!(request.cookie.as_deref(), Some("token=admin"));
}

#[tokio::test]
async fn test_variation_update_payload() {
    let backend = FakeBackend::start().await;
    backend.ok(
        Method::PUT,
        "/api/variation/v1",
        json!({"success": true, "data": {"_id": "v1", "name": "Color", "value": "Sand", "stock": 3}}),
    );

    let input = VariationInput {
        product_id: ProductId::new("p1"),
        name: "Color".to_string(),
        value: "Sand".to_string(),
        price: None,
        stock: 3,
        sku: None,
    };
    let variation = admin(&backend)
        .update_variation(
            &decor_api::BackendSession::new("token=admin"),
            &VariationId::new("v1"),
            &input,
        )
        .await
        .expect("variation updated");
    assert_eq!(variation.label(), "Color: Sand");

    let body = backend.last_request(&Method::PUT, "/api/variation/v1").body;
    assert_eq!(
        body,
        json!({"productId": "p1", "name": "Color", "value": "Sand", "price": null, "stock": 3})
    );
}
