//! Orders list page handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use decor_core::OrderStatus;
use decor_core::orders::{DateRange, OrderFilter, OrderStats, partition};
use decor_core::slice::Slice;
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::routes::{into_slice, non_blank};
use crate::state::AppState;
use crate::views::{Layout, OrderRow, SelectOption, StatCard};

/// List filters, all optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrdersQuery {
    /// Preset key or `custom`.
    pub range: String,
    /// `YYYY-MM-DD`, custom range only.
    pub from: String,
    /// `YYYY-MM-DD`, custom range only.
    pub to: String,
    pub status: String,
    /// Order id, order number or customer name.
    pub q: String,
}

impl OrdersQuery {
    /// Filter described by the query.
    #[must_use]
    pub fn filter(&self) -> OrderFilter {
        OrderFilter {
            range: DateRange::from_query(
                non_blank(&self.range).as_deref(),
                Some(self.from.as_str()),
                Some(self.to.as_str()),
            ),
            status: non_blank(&self.status).map(OrderStatus::from),
            query: non_blank(&self.q),
        }
    }
}

/// Orders list page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub rows: Slice<OrderRow>,
    /// Orders left out by the filter.
    pub hidden: usize,
    pub stats: StatCard,
    pub range_options: Vec<SelectOption>,
    pub status_options: Vec<SelectOption>,
    pub is_custom: bool,
    pub from: String,
    pub to: String,
    pub q: String,
}

fn range_options(range: &DateRange) -> Vec<SelectOption> {
    let custom = DateRange::Custom {
        from: chrono::NaiveDate::MIN,
        to: chrono::NaiveDate::MIN,
    };
    DateRange::PRESETS
        .iter()
        .chain(std::iter::once(&custom))
        .map(|r| SelectOption::new(r.key(), r.label(), range.key()))
        .collect()
}

fn status_options(status: Option<&OrderStatus>) -> Vec<SelectOption> {
    let current = status.map_or("", OrderStatus::as_str);
    std::iter::once(SelectOption::new("", "Any status", current))
        .chain(
            OrderStatus::SELECTABLE
                .iter()
                .map(|s| SelectOption::new(s.as_str(), s.label(), current)),
        )
        .collect()
}

/// List orders matching the filters, with totals for the matching set.
#[instrument(skip(state, admin, layout))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
    Query(query): Query<OrdersQuery>,
) -> Result<impl IntoResponse> {
    let filter = query.filter();
    let currency = state.currency();
    let orders = into_slice(state.api().orders(&admin.backend).await, "orders")?;

    let (matching, rest) = partition(&orders.items, &filter, Utc::now());
    let stats = StatCard::new(
        filter.range.label(),
        &OrderStats::collect(matching.iter().copied()),
        currency,
    );

    let mut rows = Slice::new();
    if orders.is_error() {
        rows.rejected(orders.error_message());
    } else {
        rows.fulfilled(matching.iter().map(|o| OrderRow::new(o, currency)).collect());
    }

    let is_custom = matches!(filter.range, DateRange::Custom { .. });
    let (from, to) = match filter.range {
        DateRange::Custom { from, to } => (from.to_string(), to.to_string()),
        _ => (String::new(), String::new()),
    };

    Ok(OrdersTemplate {
        layout,
        hidden: rest.len(),
        stats,
        range_options: range_options(&filter.range),
        status_options: status_options(filter.status.as_ref()),
        is_custom,
        from,
        to,
        q: filter.query.clone().unwrap_or_default(),
        rows,
    })
}
