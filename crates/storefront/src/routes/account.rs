//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use decor_core::OrderId;
use decor_core::slice::Slice;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;
use crate::views::{Layout, OrderDetail, OrderRow};

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub orders: Slice<OrderRow>,
}

/// Order detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/order.html")]
pub struct OrderTemplate {
    pub layout: Layout,
    pub order: OrderDetail,
}

/// Display the shopper's orders.
#[instrument(skip(state, user, layout))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    layout: Layout,
) -> Result<impl IntoResponse> {
    let currency = state.currency();
    let mut orders = Slice::new();
    match state.api().my_orders(&user.backend).await {
        Ok(list) => orders.fulfilled(list.iter().map(|o| OrderRow::new(o, currency)).collect()),
        Err(e) if e.is_unauthorized() => return Err(e.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load orders");
            orders.rejected(e.user_message());
        }
    }

    Ok(OrdersTemplate { layout, orders })
}

/// Display one order.
///
/// # Errors
///
/// Returns 404 for an order that is unknown or not the shopper's.
#[instrument(skip(state, user, layout))]
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    layout: Layout,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let order = state
        .api()
        .order(&user.backend, &OrderId::new(id.clone()))
        .await
        .map_err(|e| match e {
            e if e.is_not_found() => AppError::NotFound(format!("order {id}")),
            decor_api::ApiError::Forbidden => AppError::NotFound(format!("order {id}")),
            e => AppError::Api(e),
        })?;

    Ok(OrderTemplate {
        layout,
        order: OrderDetail::new(&order, state.currency()),
    })
}
