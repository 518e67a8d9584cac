//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use chrono::{DateTime, Utc};
use decor_api::requests::ProductQuery;
use decor_core::OrderStatus;
use decor_core::model::{Order, Product};
use decor_core::orders::{DateRange, OrderStats};
use decor_core::slice::Slice;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::routes::into_slice;
use crate::state::AppState;
use crate::views::{Layout, OrderRow, ProductRow, StatCard};

/// Windows summarised at the top of the dashboard.
const STAT_WINDOWS: [DateRange; 3] = [DateRange::Today, DateRange::Last7Days, DateRange::Last30Days];

/// Pending orders listed on the dashboard.
const PENDING_SHOWN: usize = 10;

/// Products scanned for the low-stock list.
const STOCK_SCAN_LIMIT: u32 = 100;

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub stats: Vec<StatCard>,
    pub pending: Slice<OrderRow>,
    pub pending_total: usize,
    pub low_stock: Slice<ProductRow>,
    pub low_stock_threshold: i64,
}

/// Order stats for each dashboard window.
fn stat_cards(state: &AppState, orders: &[Order], now: DateTime<Utc>) -> Vec<StatCard> {
    STAT_WINDOWS
        .iter()
        .map(|range| {
            let stats = OrderStats::collect(
                orders
                    .iter()
                    .filter(|order| range.contains(now, order.created_at)),
            );
            StatCard::new(range.label(), &stats, state.currency())
        })
        .collect()
}

/// Products at or below the threshold, lowest stock first.
fn low_stock(products: Vec<Product>, threshold: i64) -> Vec<Product> {
    let mut low: Vec<Product> = products
        .into_iter()
        .filter(|p| p.stock <= threshold)
        .collect();
    low.sort_by_key(|p| p.stock);
    low
}

/// Display the admin dashboard.
#[instrument(skip(state, admin, layout))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
) -> Result<impl IntoResponse> {
    let api = state.api();
    let query = ProductQuery {
        limit: Some(STOCK_SCAN_LIMIT),
        ..ProductQuery::default()
    };
    let (orders, products) = tokio::join!(
        api.orders(&admin.backend),
        api.products(&admin.backend, &query)
    );

    let now = Utc::now();
    let currency = state.currency();
    let threshold = state.config().low_stock_threshold;

    let orders = into_slice(orders, "orders")?;
    let stats = stat_cards(&state, &orders.items, now);
    let pending_orders: Vec<&Order> = orders
        .items
        .iter()
        .filter(|o| o.status == OrderStatus::Pending)
        .collect();
    let pending_total = pending_orders.len();
    let mut pending = Slice::new();
    if orders.is_error() {
        pending.rejected(orders.error_message());
    } else {
        pending.fulfilled(
            pending_orders
                .into_iter()
                .take(PENDING_SHOWN)
                .map(|o| OrderRow::new(o, currency))
                .collect(),
        );
    }

    let low_stock = into_slice(products.map(|page| low_stock(page.items, threshold)), "products")?
        .map(|p| ProductRow::new(&p, currency, threshold));

    Ok(DashboardTemplate {
        layout,
        stats,
        pending,
        pending_total,
        low_stock,
        low_stock_threshold: threshold,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_low_stock_sorted_and_inclusive() {
        let products: Vec<Product> = serde_json::from_value(json!([
            {"_id": "a", "name": "Lamp", "price": 40, "stock": 12},
            {"_id": "b", "name": "Vase", "price": 20, "stock": 5},
            {"_id": "c", "name": "Rug", "price": 90, "stock": 0},
        ]))
        .unwrap();
        let low = low_stock(products, 5);
        let ids: Vec<&str> = low.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["c", "b"]);
    }
}
