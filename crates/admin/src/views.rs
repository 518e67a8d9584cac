//! Template view models for the admin panel.
//!
//! Amounts are formatted and select options marked here so templates only
//! print strings.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use decor_core::coupon::CouponState;
use decor_core::model::{
    Address, Blog, Category, Coupon, Order, Product, Record, SubCategory, Variation,
};
use decor_core::orders::OrderStats;
use decor_core::slice::Notice;
use decor_core::{CurrencyCode, OrderStatus, Price};
use rust_decimal::Decimal;
use tower_sessions::Session;
use url::form_urlencoded;

use crate::middleware::{OptionalAdminAuth, take_notice};

pub(crate) fn money(amount: Decimal, currency: CurrencyCode) -> String {
    Price::new(amount, currency).display()
}

/// Date and time shown in tables, e.g. `Jun 15, 2024 09:30`.
#[must_use]
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y %H:%M").to_string()
}

/// Value for an `<input type="date">`.
#[must_use]
pub fn date_input(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

// =============================================================================
// Layout
// =============================================================================

/// Data every admin page's chrome needs.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub notice: Option<Notice>,
    pub admin_name: Option<String>,
    pub current_path: String,
}

impl Layout {
    /// `active` for the nav link whose section contains the current page.
    #[must_use]
    pub fn nav_class(&self, prefix: &str) -> &'static str {
        let active = if prefix == "/" {
            self.current_path == "/"
        } else {
            self.current_path == prefix
                || self
                    .current_path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        };
        if active { "active" } else { "" }
    }
}

impl<S> FromRequestParts<S> for Layout
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let OptionalAdminAuth(admin) = OptionalAdminAuth::from_request_parts(parts, state).await?;
        let notice = match parts.extensions.get::<Session>() {
            Some(session) => take_notice(session).await,
            None => None,
        };

        Ok(Self {
            notice,
            admin_name: admin.map(|a| a.display_name().to_string()),
            current_path: parts.uri.path().to_string(),
        })
    }
}

// =============================================================================
// Shared widgets
// =============================================================================

/// One `<option>` of a `<select>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>, current: &str) -> Self {
        let value = value.into();
        Self {
            selected: value == current,
            label: label.into(),
            value,
        }
    }
}

/// Options for a record picker with a leading "none" entry.
#[must_use]
pub fn record_options<R: Record>(records: &[R], current: &str, none_label: &str) -> Vec<SelectOption> {
    std::iter::once(SelectOption::new("", none_label, current))
        .chain(
            records
                .iter()
                .map(|r| SelectOption::new(r.record_id(), r.display_name(), current)),
        )
        .collect()
}

/// Previous/next links for a paginated table.
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub page: u32,
    pub pages: u32,
    pub previous: Option<String>,
    pub next: Option<String>,
}

impl Pagination {
    /// Links for `page` of `pages`, keeping non-empty `params`.
    #[must_use]
    pub fn new(path: &str, params: &[(&str, &str)], page: u32, pages: u32) -> Self {
        let pages = pages.max(1);
        let page = page.clamp(1, pages);
        let link = |target: u32| {
            let mut query = form_urlencoded::Serializer::new(String::new());
            for (key, value) in params.iter().filter(|(_, v)| !v.trim().is_empty()) {
                query.append_pair(key, value.trim());
            }
            if target > 1 {
                query.append_pair("page", &target.to_string());
            }
            let query = query.finish();
            if query.is_empty() {
                path.to_string()
            } else {
                format!("{path}?{query}")
            }
        };

        Self {
            page,
            pages,
            previous: (page > 1).then(|| link(page - 1)),
            next: (page < pages).then(|| link(page + 1)),
        }
    }

    #[must_use]
    pub const fn is_needed(&self) -> bool {
        self.pages > 1
    }
}

// =============================================================================
// Dashboard
// =============================================================================

/// Order count and revenue over one window.
#[derive(Debug, Clone)]
pub struct StatCard {
    pub label: &'static str,
    pub orders: usize,
    pub revenue: String,
    pub pending: usize,
}

impl StatCard {
    #[must_use]
    pub fn new(label: &'static str, stats: &OrderStats, currency: CurrencyCode) -> Self {
        Self {
            label,
            orders: stats.count,
            revenue: money(stats.revenue, currency),
            pending: stats.count_of(&OrderStatus::Pending),
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub price: String,
    pub sale_price: Option<String>,
    pub stock: i64,
    pub low_stock: bool,
    pub category: String,
    pub image: Option<String>,
    pub featured: bool,
}

impl ProductRow {
    #[must_use]
    pub fn new(product: &Product, currency: CurrencyCode, low_stock_threshold: i64) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            slug: product.slug.clone(),
            price: money(product.price, currency),
            sale_price: product.discount_price.map(|p| money(p, currency)),
            stock: product.stock,
            low_stock: product.stock <= low_stock_threshold,
            category: product
                .category
                .as_ref()
                .and_then(|c| c.name())
                .unwrap_or("-")
                .to_string(),
            image: product.primary_image().map(|img| img.url.clone()),
            featured: product.is_featured,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariationRow {
    pub id: String,
    pub label: String,
    pub price: String,
    pub stock: i64,
    pub sku: String,
}

impl VariationRow {
    #[must_use]
    pub fn new(variation: &Variation, currency: CurrencyCode) -> Self {
        Self {
            id: variation.id.to_string(),
            label: variation.label(),
            price: variation
                .price
                .map_or_else(|| "Product price".to_string(), |p| money(p, currency)),
            stock: variation.stock,
            sku: variation.sku.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageView {
    pub url: String,
    pub public_id: String,
}

/// Category or sub-category row.
#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    /// Parent category name (sub-categories only).
    pub parent: Option<String>,
}

impl From<&Category> for CategoryRow {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id.to_string(),
            name: category.name.clone(),
            slug: category.slug.clone(),
            image: category.image.clone(),
            parent: None,
        }
    }
}

impl From<&SubCategory> for CategoryRow {
    fn from(sub: &SubCategory) -> Self {
        Self {
            id: sub.id.to_string(),
            name: sub.name.clone(),
            slug: sub.slug.clone(),
            image: sub.image.clone(),
            parent: Some(
                sub.category
                    .as_ref()
                    .and_then(|c| c.name())
                    .unwrap_or("-")
                    .to_string(),
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlogRow {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub author: String,
    pub published: bool,
    pub created: String,
}

impl From<&Blog> for BlogRow {
    fn from(blog: &Blog) -> Self {
        Self {
            id: blog.id.to_string(),
            title: blog.title.clone(),
            slug: blog.slug.clone(),
            author: blog.author.clone().unwrap_or_default(),
            published: blog.published,
            created: blog.created_at.map(timestamp).unwrap_or_default(),
        }
    }
}

// =============================================================================
// Coupons
// =============================================================================

#[derive(Debug, Clone)]
pub struct CouponRow {
    pub id: String,
    pub code: String,
    pub discount: String,
    pub min_purchase: String,
    pub usage: String,
    pub window: String,
    pub state: &'static str,
    pub state_class: &'static str,
}

impl CouponRow {
    #[must_use]
    pub fn new(coupon: &Coupon, now: DateTime<Utc>, currency: CurrencyCode) -> Self {
        let state = coupon.state(now);
        let usage = match coupon.usage_limit {
            Some(limit) => format!("{} / {limit}", coupon.used_count),
            None => coupon.used_count.to_string(),
        };
        let window = match (coupon.valid_from, coupon.valid_until) {
            (None, None) => "Always".to_string(),
            (from, until) => format!(
                "{} to {}",
                from.map_or_else(|| "now".to_string(), date_input),
                until.map_or_else(|| "open".to_string(), date_input),
            ),
        };

        Self {
            id: coupon.id.to_string(),
            code: coupon.code.clone(),
            discount: coupon.describe(),
            min_purchase: coupon
                .min_purchase
                .map_or_else(|| "-".to_string(), |m| money(m, currency)),
            usage,
            window,
            state: state.label(),
            state_class: match state {
                CouponState::Active => "badge--success",
                CouponState::Scheduled => "badge--info",
                CouponState::Inactive | CouponState::Expired | CouponState::Exhausted => {
                    "badge--muted"
                }
            },
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone)]
pub struct OrderRow {
    pub id: String,
    pub reference: String,
    pub customer: String,
    pub placed_at: String,
    pub status: String,
    pub status_class: String,
    pub item_count: u32,
    pub total: String,
}

impl OrderRow {
    #[must_use]
    pub fn new(order: &Order, currency: CurrencyCode) -> Self {
        Self {
            id: order.id.to_string(),
            reference: order.reference().to_string(),
            customer: order.shipping_address.full_name.clone(),
            placed_at: timestamp(order.created_at),
            status: order.status.label(),
            status_class: format!("status--{}", order.status.as_str()),
            item_count: order.item_count(),
            total: money(order.total, currency),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AddressView {
    pub full_name: String,
    pub phone: String,
    pub one_line: String,
}

impl From<&Address> for AddressView {
    fn from(address: &Address) -> Self {
        Self {
            full_name: address.full_name.clone(),
            phone: address.phone.clone(),
            one_line: address.one_line(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderLine {
    pub name: String,
    pub variation: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
}

/// Full order for the detail page.
#[derive(Debug, Clone)]
pub struct OrderDetail {
    pub row: OrderRow,
    pub lines: Vec<OrderLine>,
    pub shipping_address: AddressView,
    pub billing_address: Option<AddressView>,
    pub payment_method: &'static str,
    pub coupon_code: Option<String>,
    pub subtotal: String,
    pub discount: Option<String>,
    pub shipping: String,
    pub tax: String,
    pub total: String,
    pub status_options: Vec<SelectOption>,
}

impl OrderDetail {
    #[must_use]
    pub fn new(order: &Order, currency: CurrencyCode) -> Self {
        let mut status_options: Vec<SelectOption> = OrderStatus::SELECTABLE
            .iter()
            .map(|s| SelectOption::new(s.as_str(), s.label(), order.status.as_str()))
            .collect();
        // Keep a status this panel does not know about selectable as-is
        if let OrderStatus::Other(raw) = &order.status {
            status_options.push(SelectOption::new(raw.as_str(), order.status.label(), raw));
        }

        Self {
            row: OrderRow::new(order, currency),
            lines: order
                .items
                .iter()
                .map(|item| OrderLine {
                    name: item.name.clone(),
                    variation: item.variation.clone(),
                    quantity: item.quantity,
                    price: money(item.price, currency),
                    line_total: money(item.price * Decimal::from(item.quantity), currency),
                })
                .collect(),
            shipping_address: AddressView::from(&order.shipping_address),
            billing_address: order.billing_address.as_ref().map(AddressView::from),
            payment_method: order.payment_method.label(),
            coupon_code: order.coupon_code.clone(),
            subtotal: money(order.subtotal, currency),
            discount: (order.discount > Decimal::ZERO).then(|| money(-order.discount, currency)),
            shipping: money(order.shipping_cost, currency),
            tax: money(order.tax, currency),
            total: money(order.total, currency),
            status_options,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_nav_class_matches_section() {
        let layout = Layout {
            current_path: "/products/p1/edit".to_string(),
            ..Layout::default()
        };
        assert_eq!(layout.nav_class("/products"), "active");
        assert_eq!(layout.nav_class("/"), "");
        assert_eq!(layout.nav_class("/product"), "");

        let home = Layout {
            current_path: "/".to_string(),
            ..Layout::default()
        };
        assert_eq!(home.nav_class("/"), "active");
    }

    #[test]
    fn test_pagination_keeps_search() {
        let pages = Pagination::new("/products", &[("q", "lamp"), ("category", "")], 1, 3);
        assert!(pages.previous.is_none());
        assert_eq!(pages.next.as_deref(), Some("/products?q=lamp&page=2"));
    }

    #[test]
    fn test_product_row_flags_low_stock() {
        let product: Product = serde_json::from_value(json!({
            "_id": "p1", "name": "Jute Rug", "price": 80, "stock": 5,
            "category": {"_id": "c1", "name": "Rugs"}
        }))
        .unwrap();
        let row = ProductRow::new(&product, CurrencyCode::USD, 5);
        assert!(row.low_stock);
        assert_eq!(row.category, "Rugs");
        assert_eq!(row.price, "$80.00");

        let row = ProductRow::new(&product, CurrencyCode::USD, 4);
        assert!(!row.low_stock);
    }

    #[test]
    fn test_coupon_row_labels_state() {
        let coupon: Coupon = serde_json::from_value(json!({
            "_id": "k1", "code": "SUMMER", "type": "percentage", "value": 20,
            "usageLimit": 50, "usedCount": 50,
            "validUntil": (now() + Duration::days(10)).to_rfc3339()
        }))
        .unwrap();
        let row = CouponRow::new(&coupon, now(), CurrencyCode::USD);
        assert_eq!(row.state, "Used up");
        assert_eq!(row.state_class, "badge--muted");
        assert_eq!(row.usage, "50 / 50");
        assert_eq!(row.window, "now to 2024-06-25");
        assert_eq!(row.discount, "20% off");
    }

    #[test]
    fn test_order_detail_selects_current_status() {
        let order: Order = serde_json::from_value(json!({
            "_id": "o1",
            "shippingAddress": {
                "fullName": "Ada", "phone": "5550100", "line1": "1 Main St",
                "city": "Springfield", "state": "IL", "postalCode": "62701", "country": "US"
            },
            "items": [{"name": "Vase", "quantity": 2, "price": 12.5}],
            "status": "shipped",
            "subtotal": 25, "shippingCost": 5, "total": 30,
            "createdAt": now().to_rfc3339(),
        }))
        .unwrap();
        let detail = OrderDetail::new(&order, CurrencyCode::USD);
        let selected: Vec<_> = detail
            .status_options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value.as_str())
            .collect();
        assert_eq!(selected, ["shipped"]);
        assert_eq!(detail.lines[0].line_total, "$25.00");
        assert!(detail.discount.is_none());
        assert_eq!(detail.row.reference, "o1");
    }

    #[test]
    fn test_unknown_status_stays_selectable() {
        let order: Order = serde_json::from_value(json!({
            "_id": "o2",
            "shippingAddress": {
                "fullName": "Ada", "phone": "5550100", "line1": "1 Main St",
                "city": "Springfield", "state": "IL", "postalCode": "62701", "country": "US"
            },
            "status": "on_hold",
            "total": 0,
            "createdAt": now().to_rfc3339(),
        }))
        .unwrap();
        let detail = OrderDetail::new(&order, CurrencyCode::USD);
        let last = detail.status_options.last().unwrap();
        assert_eq!(last.value, "on_hold");
        assert!(last.selected);
    }
}
