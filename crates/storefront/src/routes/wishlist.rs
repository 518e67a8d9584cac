//! Wishlist route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use decor_api::requests::AddToCart;
use decor_core::ProductId;
use decor_core::slice::{Notice, Slice};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::{RequireAuth, push_notice};
use crate::routes::cart::refresh_cart_count;
use crate::routes::{redirect_with_error, safe_redirect};
use crate::state::AppState;
use crate::views::{Layout, ProductCard};

/// Wishlist form data.
#[derive(Debug, Deserialize)]
pub struct WishlistForm {
    pub product_id: String,
    pub redirect: Option<String>,
}

/// Wishlist page template.
#[derive(Template, WebTemplate)]
#[template(path = "wishlist/show.html")]
pub struct WishlistTemplate {
    pub layout: Layout,
    pub products: Slice<ProductCard>,
}

/// Display the wishlist.
#[instrument(skip(state, user, layout))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    layout: Layout,
) -> Result<impl IntoResponse> {
    let currency = state.currency();
    let mut products = Slice::new();
    match state.api().wishlist(&user.backend).await {
        Ok(list) => products.fulfilled(list.iter().map(|p| ProductCard::new(p, currency)).collect()),
        Err(e) if e.is_unauthorized() => return Err(e.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load wishlist");
            products.rejected(e.user_message());
        }
    }

    Ok(WishlistTemplate { layout, products })
}

/// Save a product to the wishlist.
#[instrument(skip(state, user, session))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<WishlistForm>,
) -> Result<Response> {
    let back = safe_redirect(form.redirect.as_deref(), "/wishlist");
    let product_id = ProductId::new(form.product_id);
    if let Err(e) = state.api().add_to_wishlist(&user.backend, &product_id).await {
        return redirect_with_error(&session, e, &back).await;
    }

    push_notice(&session, Notice::success("Saved to your wishlist")).await;
    Ok(Redirect::to(&back).into_response())
}

/// Remove a product from the wishlist.
#[instrument(skip(state, user, session))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<WishlistForm>,
) -> Result<Response> {
    let back = safe_redirect(form.redirect.as_deref(), "/wishlist");
    let product_id = ProductId::new(form.product_id);
    if let Err(e) = state
        .api()
        .remove_from_wishlist(&user.backend, &product_id)
        .await
    {
        return redirect_with_error(&session, e, &back).await;
    }

    push_notice(&session, Notice::info("Removed from your wishlist")).await;
    Ok(Redirect::to(&back).into_response())
}

/// Add one unit of a saved product to the cart and unsave it.
#[instrument(skip(state, user, session))]
pub async fn move_to_cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<WishlistForm>,
) -> Result<Response> {
    let product_id = ProductId::new(form.product_id);
    let request = AddToCart {
        product_id: &product_id,
        quantity: 1,
        variation_id: None,
    };
    if let Err(e) = state.api().add_to_cart(&user.backend, &request).await {
        return redirect_with_error(&session, e, "/wishlist").await;
    }

    // Best effort: the product is already in the cart.
    if let Err(e) = state
        .api()
        .remove_from_wishlist(&user.backend, &product_id)
        .await
    {
        tracing::warn!(error = %e, "Failed to remove moved product from wishlist");
    }

    refresh_cart_count(&state, &session, &user).await;
    push_notice(&session, Notice::success("Moved to your cart")).await;
    Ok(Redirect::to("/wishlist").into_response())
}
