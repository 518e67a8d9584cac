//! Template view models.
//!
//! Templates never format money or compare strings: every price is rendered
//! to a `String` and every "is this option selected" is decided here.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use decor_core::checkout::CheckoutSummary;
use decor_core::model::{Blog, CartItem, Category, Order, Product, ShippingRates, SubCategory};
use decor_core::slice::Notice;
use decor_core::{CurrencyCode, Price};
use rust_decimal::Decimal;
use tower_sessions::Session;
use url::form_urlencoded;

use crate::middleware::{OptionalAuth, take_notice};
use crate::models::session_keys;

fn money(amount: Decimal, currency: CurrencyCode) -> String {
    Price::new(amount, currency).display()
}

/// Date shown in listings, e.g. `May 1, 2024`.
#[must_use]
pub fn short_date(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

// =============================================================================
// Layout
// =============================================================================

/// Data every page's header needs.
///
/// Extracting it consumes the pending notice, so only handlers that render a
/// page should take it.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub notice: Option<Notice>,
    pub user_name: Option<String>,
    pub cart_count: u32,
}

impl<S> FromRequestParts<S> for Layout
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let OptionalAuth(user) = OptionalAuth::from_request_parts(parts, state).await?;
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self::default());
        };

        let notice = take_notice(session).await;
        let cart_count = if user.is_some() {
            session
                .get::<u32>(session_keys::CART_COUNT)
                .await
                .ok()
                .flatten()
                .unwrap_or(0)
        } else {
            0
        };

        Ok(Self {
            notice,
            user_name: user.map(|u| u.display_name().to_string()),
            cart_count,
        })
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Product tile for grids and the wishlist.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub price: String,
    /// List price, shown struck through when on sale.
    pub compare_at: Option<String>,
    pub image: Option<String>,
    pub in_stock: bool,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, currency: CurrencyCode) -> Self {
        Self {
            id: product.id.to_string(),
            slug: product.slug.clone(),
            name: product.name.clone(),
            price: money(product.effective_price(), currency),
            compare_at: product
                .is_on_sale()
                .then(|| money(product.price, currency)),
            image: product.primary_image().map(|img| img.url.clone()),
            in_stock: product.in_stock(),
        }
    }
}

/// Search suggestion returned as JSON to the header search box.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Suggestion {
    pub name: String,
    pub url: String,
    pub price: String,
    pub image: Option<String>,
}

impl Suggestion {
    #[must_use]
    pub fn new(product: &Product, currency: CurrencyCode) -> Self {
        Self {
            name: product.name.clone(),
            url: format!("/products/{}", product.slug),
            price: money(product.effective_price(), currency),
            image: product.primary_image().map(|img| img.url.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariationOption {
    pub id: String,
    pub label: String,
    pub price: Option<String>,
    pub in_stock: bool,
}

#[derive(Debug, Clone)]
pub struct AttributeRow {
    pub name: String,
    pub value: String,
}

/// Everything the product page shows.
#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub card: ProductCard,
    pub description: String,
    pub stock: i64,
    pub images: Vec<String>,
    pub category: Option<CategoryLink>,
    pub attributes: Vec<AttributeRow>,
    pub variations: Vec<VariationOption>,
}

impl ProductDetail {
    #[must_use]
    pub fn new(product: &Product, currency: CurrencyCode) -> Self {
        Self {
            card: ProductCard::new(product, currency),
            description: product.description.clone(),
            stock: product.stock,
            images: product.images.iter().map(|img| img.url.clone()).collect(),
            category: product
                .category
                .as_ref()
                .and_then(|c| c.populated())
                .map(CategoryLink::from),
            attributes: product
                .attributes
                .iter()
                .map(|a| AttributeRow {
                    name: a.name.clone(),
                    value: a.value.clone(),
                })
                .collect(),
            variations: product
                .variations
                .iter()
                .map(|v| VariationOption {
                    id: v.id.to_string(),
                    label: v.label(),
                    price: v.price.map(|p| money(p, currency)),
                    in_stock: v.stock > 0,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryLink {
    pub name: String,
    pub slug: String,
}

impl From<&Category> for CategoryLink {
    fn from(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            slug: category.slug.clone(),
        }
    }
}

/// Category tile.
#[derive(Debug, Clone)]
pub struct CategoryCard {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl From<&Category> for CategoryCard {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id.to_string(),
            name: category.name.clone(),
            slug: category.slug.clone(),
            description: category.description.clone(),
            image: category.image.clone(),
        }
    }
}

impl From<&SubCategory> for CategoryCard {
    fn from(sub: &SubCategory) -> Self {
        Self {
            id: sub.id.to_string(),
            name: sub.name.clone(),
            slug: sub.slug.clone(),
            description: sub.description.clone(),
            image: sub.image.clone(),
        }
    }
}

/// `<option>` in a filter form.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>, current: Option<&str>) -> Self {
        let value = value.into();
        let selected = current.unwrap_or_default() == value;
        Self {
            value,
            label: label.into(),
            selected,
        }
    }
}

/// Previous/next links that keep the other query parameters.
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub page: u32,
    pub pages: u32,
    pub previous: Option<String>,
    pub next: Option<String>,
}

impl Pagination {
    /// Build links for `path` with `params` (empty values dropped) plus `page`.
    #[must_use]
    pub fn new(path: &str, params: &[(&str, Option<&str>)], page: u32, pages: u32) -> Self {
        let link = |target: u32| {
            let mut query = form_urlencoded::Serializer::new(String::new());
            for (key, value) in params {
                if let Some(v) = value.filter(|v| !v.is_empty()) {
                    query.append_pair(key, v);
                }
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

        let pages = pages.max(1);
        let page = page.clamp(1, pages);
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
// Cart and checkout
// =============================================================================

#[derive(Debug, Clone)]
pub struct CartLine {
    pub id: String,
    pub product_id: String,
    pub slug: String,
    pub name: String,
    pub variation: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
    pub image: Option<String>,
}

impl CartLine {
    #[must_use]
    pub fn new(item: &CartItem, currency: CurrencyCode) -> Self {
        Self {
            id: item.id.to_string(),
            product_id: item.product.id.to_string(),
            slug: item.product.slug.clone(),
            name: item.product.name.clone(),
            variation: item.variation.as_ref().map(decor_core::model::Variation::label),
            quantity: item.quantity,
            unit_price: money(item.unit_price(), currency),
            line_total: money(item.line_total(), currency),
            image: item.product.primary_image().map(|img| img.url.clone()),
        }
    }
}

/// Formatted checkout breakdown.
#[derive(Debug, Clone, Default)]
pub struct SummaryView {
    pub item_count: u32,
    pub subtotal: String,
    pub discount: Option<String>,
    pub shipping: String,
    pub free_shipping: bool,
    pub tax: String,
    pub total: String,
    /// How much more to spend for free shipping.
    pub free_shipping_gap: Option<String>,
}

impl SummaryView {
    #[must_use]
    pub fn new(summary: &CheckoutSummary, rates: &ShippingRates, currency: CurrencyCode) -> Self {
        Self {
            item_count: summary.item_count,
            subtotal: money(summary.subtotal, currency),
            discount: (summary.discount > Decimal::ZERO)
                .then(|| money(-summary.discount, currency)),
            shipping: money(summary.shipping, currency),
            free_shipping: summary.item_count > 0 && summary.shipping.is_zero(),
            tax: money(summary.tax, currency),
            total: money(summary.total, currency),
            free_shipping_gap: summary
                .until_free_shipping(rates)
                .map(|gap| money(gap, currency)),
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
    pub placed_on: String,
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
            placed_on: short_date(order.created_at),
            status: order.status.label(),
            status_class: format!("status--{}", order.status.as_str()),
            item_count: order.item_count(),
            total: money(order.total, currency),
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
    pub ship_to_name: String,
    pub ship_to: String,
    pub phone: String,
    pub bill_to: Option<String>,
    pub payment_method: String,
    pub coupon_code: Option<String>,
    pub subtotal: String,
    pub discount: Option<String>,
    pub shipping: String,
    pub tax: String,
    pub total: String,
}

impl OrderDetail {
    #[must_use]
    pub fn new(order: &Order, currency: CurrencyCode) -> Self {
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
            ship_to_name: order.shipping_address.full_name.clone(),
            ship_to: order.shipping_address.one_line(),
            phone: order.shipping_address.phone.clone(),
            bill_to: order.billing_address.as_ref().map(decor_core::model::Address::one_line),
            payment_method: order.payment_method.label().to_string(),
            coupon_code: order.coupon_code.clone(),
            subtotal: money(order.subtotal, currency),
            discount: (order.discount > Decimal::ZERO).then(|| money(-order.discount, currency)),
            shipping: money(order.shipping_cost, currency),
            tax: money(order.tax, currency),
            total: money(order.total, currency),
        }
    }
}

// =============================================================================
// Blog
// =============================================================================

#[derive(Debug, Clone)]
pub struct BlogCard {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub cover_image: Option<String>,
    pub author: Option<String>,
    pub published_on: Option<String>,
}

/// Longest generated excerpt, in characters.
const EXCERPT_CHARS: usize = 180;

impl From<&Blog> for BlogCard {
    fn from(blog: &Blog) -> Self {
        let excerpt = blog
            .excerpt
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| excerpt_from_html(&blog.content, EXCERPT_CHARS));
        Self {
            slug: blog.slug.clone(),
            title: blog.title.clone(),
            excerpt,
            cover_image: blog.cover_image.clone(),
            author: blog.author.clone(),
            published_on: blog.created_at.map(short_date),
        }
    }
}

/// Plain-text excerpt of an HTML body: tags dropped, whitespace collapsed,
/// cut at a word boundary.
#[must_use]
pub fn excerpt_from_html(html: &str, max_chars: usize) -> String {
    let mut text = String::with_capacity(html.len().min(max_chars * 2));
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let mut out = String::new();
    for word in words {
        if out.chars().count() + word.chars().count() + 1 > max_chars {
            out.push('…');
            return out;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;

    use super::*;

    fn product(value: serde_json::Value) -> Product {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_product_card_shows_sale_price() {
        let card = ProductCard::new(
            &product(json!({
                "_id": "p1", "name": "Rattan Lamp", "slug": "rattan-lamp",
                "price": 120, "discountPrice": 99.5, "stock": 3,
                "images": [{"url": "https://cdn.example.com/lamp.jpg"}]
            })),
            CurrencyCode::USD,
        );
        assert_eq!(card.price, "$99.50");
        assert_eq!(card.compare_at.as_deref(), Some("$120.00"));
        assert_eq!(card.image.as_deref(), Some("https://cdn.example.com/lamp.jpg"));
        assert!(card.in_stock);
    }

    #[test]
    fn test_product_card_without_sale() {
        let card = ProductCard::new(
            &product(json!({"_id": "p2", "name": "Vase", "price": 30})),
            CurrencyCode::EUR,
        );
        assert_eq!(card.price, "€30.00");
        assert!(card.compare_at.is_none());
        assert!(!card.in_stock);
    }

    #[test]
    fn test_pagination_keeps_filters() {
        let pages = Pagination::new(
            "/products",
            &[("category", Some("lighting")), ("q", Some("")), ("sort", None)],
            2,
            3,
        );
        assert_eq!(pages.previous.as_deref(), Some("/products?category=lighting"));
        assert_eq!(pages.next.as_deref(), Some("/products?category=lighting&page=3"));
        assert!(pages.is_needed());
    }

    #[test]
    fn test_pagination_single_page() {
        let pages = Pagination::new("/blog", &[], 1, 0);
        assert_eq!(pages.pages, 1);
        assert!(pages.previous.is_none());
        assert!(pages.next.is_none());
        assert!(!pages.is_needed());
    }

    #[test]
    fn test_select_option_marks_current() {
        assert!(SelectOption::new("price_asc", "Price", Some("price_asc")).selected);
        assert!(!SelectOption::new("price_asc", "Price", None).selected);
        assert!(SelectOption::new("", "Featured", None).selected);
    }

    #[test]
    fn test_summary_view_formats_discount_as_negative() {
        let rates = ShippingRates {
            shipping_cost: Decimal::from(10),
            free_shipping_threshold: Some(Decimal::from(100)),
            tax_rate: Decimal::ZERO,
        };
        let summary = CheckoutSummary {
            item_count: 2,
            subtotal: Decimal::from(80),
            discount: Decimal::from_str("8").unwrap(),
            shipping: Decimal::from(10),
            tax: Decimal::ZERO,
            total: Decimal::from(82),
        };
        let view = SummaryView::new(&summary, &rates, CurrencyCode::USD);
        assert_eq!(view.discount.as_deref(), Some("-$8.00"));
        assert_eq!(view.total, "$82.00");
        assert_eq!(view.free_shipping_gap.as_deref(), Some("$28.00"));
        assert!(!view.free_shipping);
    }

    #[test]
    fn test_excerpt_strips_tags_and_truncates() {
        let html = "<p>Linen <strong>breathes</strong>.</p><p>It softens with every wash.</p>";
        assert_eq!(
            excerpt_from_html(html, 200),
            "Linen breathes . It softens with every wash."
        );
        assert_eq!(excerpt_from_html(html, 15), "Linen breathes…");
    }
}
