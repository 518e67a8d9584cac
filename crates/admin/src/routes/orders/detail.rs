//! Order detail and status change handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use decor_core::{OrderId, OrderStatus};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::routes::{non_blank, not_found_as, redirect_with_error, redirect_with_notice};
use crate::state::AppState;
use crate::views::{Layout, OrderDetail};

/// Order detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub layout: Layout,
    pub order: OrderDetail,
}

/// Status change form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    pub status: String,
}

/// Display one order.
///
/// # Errors
///
/// Returns 404 for an unknown order.
#[instrument(skip(state, admin, layout))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
    Path(id): Path<OrderId>,
) -> Result<impl IntoResponse> {
    let order = state
        .api()
        .order(&admin.backend, &id)
        .await
        .map_err(not_found_as(format!("order {id}")))?;

    Ok(OrderShowTemplate {
        layout,
        order: OrderDetail::new(&order, state.currency()),
    })
}

/// Move an order to another status. Any status may follow any other.
#[instrument(skip(state, admin, session, form))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path(id): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Result<Response> {
    let back = format!("/orders/{id}");
    let Some(status) = non_blank(&form.status).map(OrderStatus::from) else {
        let error = AppError::BadRequest("Choose a status.".to_string());
        return redirect_with_error(&session, error, &back).await;
    };

    match state
        .api()
        .update_order_status(&admin.backend, &id, &status)
        .await
    {
        Ok(order) => {
            tracing::info!(order_id = %id, status = %order.status, admin_id = %admin.id, "Order status changed");
            Ok(redirect_with_notice(
                &session,
                format!("Order {} marked {}.", order.reference(), order.status.label()),
                &back,
            )
            .await)
        }
        Err(e) => redirect_with_error(&session, e, &back).await,
    }
}
