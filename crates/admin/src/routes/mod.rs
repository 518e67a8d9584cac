//! HTTP route handlers for the admin panel.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                    - Dashboard
//! GET  /health                              - Liveness
//! GET  /health/ready                        - Readiness (backend reachable)
//!
//! # Auth (login rate limited)
//! GET  /auth/login                          - Login page
//! POST /auth/login                          - Login action (admin role only)
//! POST /auth/logout                         - Logout action
//!
//! # Products
//! GET  /products                            - List (q, category, page)
//! GET  /products/new                        - New product form
//! POST /products                            - Create
//! GET  /products/{id}/edit                  - Edit form, variations, images
//! POST /products/{id}                       - Update
//! POST /products/{id}/delete                - Delete
//! POST /products/{id}/variations            - Add a variation
//! POST /products/{id}/variations/{vid}/delete - Delete a variation
//! POST /products/{id}/images                - Upload an image (multipart)
//! POST /products/{id}/images/remove         - Remove an image
//!
//! # Categories, sub-categories, blogs, coupons
//! GET  /{section}                           - List
//! GET  /{section}/new                       - New form
//! POST /{section}                           - Create
//! GET  /{section}/{id}/edit                 - Edit form
//! POST /{section}/{id}                      - Update
//! POST /{section}/{id}/delete               - Delete
//!
//! # Orders
//! GET  /orders                              - List (range, from, to, status, q)
//! GET  /orders/{id}                         - Detail
//! POST /orders/{id}/status                  - Change status
//! ```

pub mod auth;
pub mod blogs;
pub mod categories;
pub mod coupons;
pub mod dashboard;
pub mod health;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use decor_api::ApiError;
use decor_api::admin::MAX_IMAGE_BYTES;
use decor_core::slice::{Notice, Slice};
use decor_core::validation::{ValidationError, ValidationResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use tower_sessions::Session;

use crate::error::AppError;
use crate::middleware::{login_rate_limiter, push_notice};
use crate::state::AppState;

/// Room for the multipart framing around an image.
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

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

/// `None` for blank input, the trimmed value otherwise.
#[must_use]
pub fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parse an optional money field typed into a form.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidFormat`] when the value is not a number.
pub fn parse_amount(field: &'static str, value: &str) -> ValidationResult<Option<Decimal>> {
    non_blank(value)
        .map(|v| {
            v.parse::<Decimal>().map_err(|_| ValidationError::InvalidFormat {
                field,
                reason: "must be a number",
            })
        })
        .transpose()
}

/// Parse an optional whole-number field typed into a form.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidFormat`] when the value is not an integer.
pub fn parse_count<T: std::str::FromStr>(field: &'static str, value: &str) -> ValidationResult<Option<T>> {
    non_blank(value)
        .map(|v| {
            v.parse::<T>().map_err(|_| ValidationError::InvalidFormat {
                field,
                reason: "must be a whole number",
            })
        })
        .transpose()
}

/// Resolve a listing call into a slice for the template.
///
/// # Errors
///
/// Passes an expired backend session through so the admin is sent to sign in.
pub fn into_slice<T>(result: Result<Vec<T>, ApiError>, what: &str) -> Result<Slice<T>, AppError> {
    let mut slice = Slice::new();
    match result {
        Ok(items) => slice.fulfilled(items),
        Err(e) if e.is_unauthorized() => return Err(e.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load {what}");
            slice.rejected(e.user_message());
        }
    }
    Ok(slice)
}

/// Map a failed single-record fetch, turning a backend 404 into ours.
pub fn not_found_as(what: String) -> impl FnOnce(ApiError) -> AppError {
    move |e| {
        if e.is_not_found() {
            AppError::NotFound(what)
        } else {
            AppError::Api(e)
        }
    }
}

/// Message for a form re-rendered after the backend refused it.
///
/// # Errors
///
/// Returns the error itself when the backend rejected the session.
pub fn form_error(error: ApiError) -> Result<String, AppError> {
    if error.is_unauthorized() {
        return Err(error.into());
    }
    if !error.is_client_error() {
        tracing::warn!(error = %error, "Admin form submission failed");
    }
    Ok(AppError::Api(error).user_message())
}

/// Turn a failed mutation into an error notice and a redirect.
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
        tracing::warn!(error = %error, "Admin mutation failed");
    }
    push_notice(session, Notice::error(error.user_message())).await;
    Ok(Redirect::to(to).into_response())
}

/// Push a success notice and redirect.
pub async fn redirect_with_notice(session: &Session, message: impl Into<String>, to: &str) -> Response {
    push_notice(session, Notice::success(message)).await;
    Redirect::to(to).into_response()
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .layer(login_rate_limiter())
        // Added after the limiter so signing out is never throttled
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/new", get(products::new))
        .route("/{id}", post(products::update))
        .route("/{id}/edit", get(products::edit))
        .route("/{id}/delete", post(products::delete))
        .route("/{id}/variations", post(products::add_variation))
        .route(
            "/{id}/variations/{variation_id}/delete",
            post(products::delete_variation),
        )
        .route(
            "/{id}/images",
            post(products::upload_image)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + UPLOAD_OVERHEAD_BYTES)),
        )
        .route("/{id}/images/remove", post(products::remove_image))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index).post(categories::create))
        .route("/new", get(categories::new))
        .route("/{id}", post(categories::update))
        .route("/{id}/edit", get(categories::edit))
        .route("/{id}/delete", post(categories::delete))
}

/// Create the sub-category routes router.
pub fn sub_category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::sub_index).post(categories::sub_create))
        .route("/new", get(categories::sub_new))
        .route("/{id}", post(categories::sub_update))
        .route("/{id}/edit", get(categories::sub_edit))
        .route("/{id}/delete", post(categories::sub_delete))
}

/// Create the blog routes router.
pub fn blog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(blogs::index).post(blogs::create))
        .route("/new", get(blogs::new))
        .route("/{id}", post(blogs::update))
        .route("/{id}/edit", get(blogs::edit))
        .route("/{id}/delete", post(blogs::delete))
}

/// Create the coupon routes router.
pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(coupons::index).post(coupons::create))
        .route("/new", get(coupons::new))
        .route("/{id}", post(coupons::update))
        .route("/{id}/edit", get(coupons::edit))
        .route("/{id}/delete", post(coupons::delete))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", post(orders::update_status))
}

/// Create all routes for the admin panel.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::dashboard))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .nest("/sub-categories", sub_category_routes())
        .nest("/blogs", blog_routes())
        .nest("/coupons", coupon_routes())
        .nest("/orders", order_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("price", " 19.90 ").unwrap(), Some(Decimal::from_str("19.90").unwrap()));
        assert_eq!(parse_amount("price", "").unwrap(), None);
        assert_eq!(
            parse_amount("price", "ten").unwrap_err().field(),
            "price"
        );
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count::<i64>("stock", "12").unwrap(), Some(12));
        assert_eq!(parse_count::<u32>("usage limit", "  ").unwrap(), None);
        assert!(parse_count::<u32>("usage limit", "-1").is_err());
        assert!(parse_count::<i64>("stock", "1.5").is_err());
    }

    #[test]
    fn test_into_slice_passes_expired_session_through() {
        let err = into_slice::<u8>(Err(ApiError::Unauthorized), "orders").unwrap_err();
        assert!(matches!(err, AppError::Api(ApiError::Unauthorized)));

        let slice = into_slice::<u8>(Err(ApiError::from_status(500, None)), "orders").unwrap();
        assert!(slice.is_error());
        assert!(!slice.error_message().contains("500"));
    }
}
