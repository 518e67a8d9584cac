//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - Home page (featured products, categories)
//! GET  /health                   - Liveness
//! GET  /health/ready             - Readiness (backend reachable)
//!
//! # Catalog
//! GET  /products                 - Product listing (category, sub_category, q, sort, page)
//! GET  /products/{slug}          - Product detail
//! GET  /categories               - Category listing
//! GET  /categories/{slug}        - Category detail
//! GET  /search/suggest?q=        - Search suggestions (JSON)
//!
//! # Cart (requires auth)
//! GET  /cart                     - Cart page
//! POST /cart/add                 - Add a product
//! POST /cart/update              - Change a line's quantity
//! POST /cart/remove              - Remove a line
//! POST /cart/clear               - Empty the cart
//!
//! # Checkout (requires auth)
//! GET  /checkout                 - Address form and totals
//! POST /checkout                 - Place the order
//! POST /checkout/coupon          - Apply a coupon
//! POST /checkout/coupon/remove   - Drop the applied coupon
//!
//! # Account (requires auth)
//! GET  /account/orders           - Order history
//! GET  /account/orders/{id}      - Order detail
//! GET  /wishlist                 - Wishlist
//! POST /wishlist/add             - Save a product
//! POST /wishlist/remove          - Unsave a product
//! POST /wishlist/move-to-cart    - Move a saved product to the cart
//!
//! # Blog
//! GET  /blog                     - Post listing
//! GET  /blog/{slug}              - Post
//!
//! # Auth (rate limited)
//! GET  /auth/login               - Login page
//! POST /auth/login               - Login action
//! GET  /auth/register            - Register page
//! POST /auth/register            - Register action
//! POST /auth/logout              - Logout action
//! ```

pub mod account;
pub mod auth;
pub mod blog;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod health;
pub mod home;
pub mod products;
pub mod search;
pub mod wishlist;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use decor_api::ApiError;
use decor_core::slice::Notice;
use serde::{Deserialize, Deserializer};
use tower_sessions::Session;

use crate::error::AppError;
use crate::middleware::{auth_rate_limiter, push_notice};
use crate::state::AppState;

/// Deserialize an empty form or query value as `None`.
///
/// # Errors
///
/// Returns an error if a non-empty value does not parse as `T`.
pub fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Only same-site absolute paths are followed after a form post.
///
/// Targets containing control characters are refused: browsers drop tabs
/// and newlines from `Location`, so `/\t/host` reads as `//host`.
#[must_use]
pub fn safe_redirect(target: Option<&str>, fallback: &str) -> String {
    target
        .filter(|t| {
            t.starts_with('/')
                && !t.starts_with("//")
                && !t.contains('\\')
                && !t.chars().any(char::is_control)
        })
        .unwrap_or(fallback)
        .to_string()
}

/// Turn a failed mutation into an error notice and a redirect.
///
/// An expired backend session is passed through so the shopper is sent to
/// sign in again.
///
/// # Errors
///
/// Returns the error itself when the backend rejected the session.
pub async fn redirect_with_error(
    session: &Session,
    error: impl Into<AppError>,
    to: &str,
) -> Result<Response, AppError> {
    let error = error.into();
    if matches!(error, AppError::Api(ApiError::Unauthorized)) {
        return Err(error);
    }
    if error.is_server_error() {
        tracing::warn!(error = %error, "Mutation failed");
    }
    push_notice(session, Notice::error(error.user_message())).await;
    Ok(Redirect::to(to).into_response())
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .layer(auth_rate_limiter())
        // Added after the limiter so signing out is never throttled
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{slug}", get(products::show))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index))
        .route("/{slug}", get(categories::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::place_order))
        .route("/coupon", post(checkout::apply_coupon))
        .route("/coupon/remove", post(checkout::remove_coupon))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show))
        .route("/add", post(wishlist::add))
        .route("/remove", post(wishlist::remove))
        .route("/move-to-cart", post(wishlist::move_to_cart))
}

/// Create the blog routes router.
pub fn blog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(blog::index))
        .route("/{slug}", get(blog::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .route("/search/suggest", get(search::suggest))
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .route("/account/orders", get(account::orders))
        .route("/account/orders/{id}", get(account::order))
        .nest("/wishlist", wishlist_routes())
        .nest("/blog", blog_routes())
        .nest("/auth", auth_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct PageQuery {
        #[serde(default, deserialize_with = "empty_string_as_none")]
        page: Option<u32>,
    }

    #[test]
    fn test_empty_string_as_none() {
        let parsed: PageQuery = serde_json::from_str(r#"{"page": ""}"#).unwrap();
        assert_eq!(parsed.page, None);
        let parsed: PageQuery = serde_json::from_str(r#"{"page": " 3 "}"#).unwrap();
        assert_eq!(parsed.page, Some(3));
        let parsed: PageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.page, None);
        assert!(serde_json::from_str::<PageQuery>(r#"{"page": "two"}"#).is_err());
    }

    #[test]
    fn test_safe_redirect() {
        assert_eq!(safe_redirect(Some("/products/oak-chair"), "/cart"), "/products/oak-chair");
        assert_eq!(safe_redirect(Some("https://evil.test"), "/cart"), "/cart");
        assert_eq!(safe_redirect(Some("//evil.test"), "/cart"), "/cart");
        assert_eq!(safe_redirect(Some("/\\evil.test"), "/cart"), "/cart");
        assert_eq!(safe_redirect(Some("/\t/evil.test"), "/cart"), "/cart");
        assert_eq!(safe_redirect(Some("/\r\n/evil.test"), "/cart"), "/cart");
        assert_eq!(safe_redirect(Some("/wishlist\n"), "/cart"), "/cart");
        assert_eq!(safe_redirect(None, "/cart"), "/cart");
    }
}
