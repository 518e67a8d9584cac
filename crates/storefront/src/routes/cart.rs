//! Cart route handlers.
//!
//! The cart lives on the backend, keyed by the shopper's backend session.
//! Every mutation is followed by a refetch so the header count matches what
//! the backend holds.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use decor_api::requests::AddToCart;
use decor_core::checkout::CheckoutSummary;
use decor_core::model::{AppliedCoupon, ShippingRates};
use decor_core::slice::Notice;
use decor_core::validation::validate_quantity;
use decor_core::{CartItemId, ProductId, VariationId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{RequireAuth, push_notice};
use crate::models::{CurrentUser, session_keys};
use crate::routes::checkout::applied_coupon;
use crate::routes::{empty_string_as_none, redirect_with_error, safe_redirect};
use crate::state::AppState;
use crate::views::{CartLine, Layout, SummaryView};

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub variation_id: Option<String>,
    /// Where to go afterwards, e.g. back to the product page.
    pub redirect: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item_id: String,
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub item_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub lines: Vec<CartLine>,
    pub summary: SummaryView,
    pub coupon_code: Option<String>,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Remember the cart's unit count for the header badge.
pub async fn remember_cart_count(session: &Session, count: u32) {
    if let Err(e) = session.insert(session_keys::CART_COUNT, count).await {
        tracing::warn!(error = %e, "Failed to store cart count in session");
    }
}

/// Refetch the cart after a mutation and update the header count.
///
/// A failed refetch keeps the previous count; the mutation itself succeeded.
pub async fn refresh_cart_count(state: &AppState, session: &Session, user: &CurrentUser) {
    match state.api().cart(&user.backend).await {
        Ok(cart) => remember_cart_count(session, cart.item_count()).await,
        Err(e) => tracing::warn!(error = %e, "Failed to refetch cart"),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(state, user, session, layout))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    mut layout: Layout,
) -> Result<impl IntoResponse> {
    let currency = state.currency();
    let (cart, rates) = tokio::join!(
        state.api().cart(&user.backend),
        state.api().shipping_rates(),
    );
    let cart = cart?;
    let rates = rates.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load shipping rates");
        ShippingRates::default()
    });

    let coupon = applied_coupon(&session).await;
    let summary = CheckoutSummary::for_cart(&cart, coupon.as_ref(), &rates);

    remember_cart_count(&session, cart.item_count()).await;
    layout.cart_count = cart.item_count();

    Ok(CartShowTemplate {
        layout,
        lines: cart.items.iter().map(|item| CartLine::new(item, currency)).collect(),
        summary: SummaryView::new(&summary, &rates, currency),
        coupon_code: coupon.map(|c| c.code),
    })
}

/// Add item to cart.
#[instrument(skip(state, user, session))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let back = safe_redirect(form.redirect.as_deref(), "/cart");
    let quantity = match validate_quantity(form.quantity.unwrap_or(1)) {
        Ok(q) => q,
        Err(e) => return redirect_with_error(&session, e, &back).await,
    };

    let product_id = ProductId::new(form.product_id);
    let variation_id = form.variation_id.map(VariationId::new);
    let request = AddToCart {
        product_id: &product_id,
        quantity,
        variation_id: variation_id.as_ref(),
    };

    if let Err(e) = state.api().add_to_cart(&user.backend, &request).await {
        return redirect_with_error(&session, e, &back).await;
    }

    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));
    refresh_cart_count(&state, &session, &user).await;
    push_notice(&session, Notice::success("Added to cart")).await;
    Ok(Redirect::to(&back).into_response())
}

/// Change a line's quantity. Zero removes the line.
#[instrument(skip(state, user, session))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let item_id = CartItemId::new(form.item_id);

    let result = if form.quantity == 0 {
        state.api().remove_cart_item(&user.backend, &item_id).await
    } else {
        let quantity = match validate_quantity(form.quantity) {
            Ok(q) => q,
            Err(e) => return redirect_with_error(&session, e, "/cart").await,
        };
        state
            .api()
            .update_cart_item(&user.backend, &item_id, quantity)
            .await
    };

    if let Err(e) = result {
        return redirect_with_error(&session, e, "/cart").await;
    }

    refresh_cart_count(&state, &session, &user).await;
    push_notice(&session, Notice::success("Cart updated")).await;
    Ok(Redirect::to("/cart").into_response())
}

/// Remove item from cart.
#[instrument(skip(state, user, session))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let item_id = CartItemId::new(form.item_id);
    if let Err(e) = state.api().remove_cart_item(&user.backend, &item_id).await {
        return redirect_with_error(&session, e, "/cart").await;
    }

    refresh_cart_count(&state, &session, &user).await;
    push_notice(&session, Notice::success("Item removed")).await;
    Ok(Redirect::to("/cart").into_response())
}

/// Empty the cart.
#[instrument(skip(state, user, session))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Response> {
    if let Err(e) = state.api().clear_cart(&user.backend).await {
        return redirect_with_error(&session, e, "/cart").await;
    }

    remember_cart_count(&session, 0).await;
    session
        .remove::<AppliedCoupon>(session_keys::APPLIED_COUPON)
        .await?;
    push_notice(&session, Notice::info("Your cart is empty")).await;
    Ok(Redirect::to("/cart").into_response())
}
