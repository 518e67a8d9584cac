//! Request payloads sent to the backend.
//!
//! Money fields are sent as JSON numbers. Orders never carry amounts: the
//! backend prices the cart itself.

use chrono::{DateTime, Utc};
use decor_core::model::{Address, Attribute, Image};
use decor_core::{CategoryId, CouponKind, OrderStatus, PaymentMethod, ProductId, SubCategoryId, VariationId};
use rust_decimal::Decimal;
use serde::Serialize;

/// Credentials for `POST /api/auth/login`.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Payload for `POST /api/auth/register`.
#[derive(Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Product listing filters for `GET /api/product`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub featured: bool,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductQuery {
    /// Query-string pairs. Unset filters are left out.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let mut push = |key, value: Option<&String>| {
            if let Some(v) = value.map(|v| v.trim()).filter(|v| !v.is_empty()) {
                pairs.push((key, v.to_string()));
            }
        };
        push("category", self.category.as_ref());
        push("subCategory", self.sub_category.as_ref());
        push("search", self.search.as_ref());
        push("sort", self.sort.as_ref());
        if self.featured {
            pairs.push(("isFeatured", "true".to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// Body of `POST /api/cart`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation_id: Option<&'a VariationId>,
}

/// Body of `PUT /api/cart/{itemId}`.
#[derive(Debug, Serialize)]
pub struct UpdateCartItem {
    pub quantity: u32,
}

/// Body of `POST /api/coupons/apply`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyCoupon<'a> {
    pub code: &'a str,
    /// Cart subtotal the backend checks the minimum purchase against.
    #[serde(with = "rust_decimal::serde::float")]
    pub cart_total: Decimal,
}

/// Body of `POST /api/order`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrder<'a> {
    pub shipping_address: &'a Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<&'a Address>,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'a str>,
}

/// Body of `PUT /api/order/{id}/status`.
#[derive(Debug, Serialize)]
pub struct UpdateOrderStatus<'a> {
    pub status: &'a OrderStatus,
}

/// Body of `POST /api/wishlist`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToWishlist<'a> {
    pub product_id: &'a ProductId,
}

/// Create/update payload for a product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub slug: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub discount_price: Option<Decimal>,
    pub stock: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<SubCategoryId>,
    pub images: Vec<Image>,
    pub attributes: Vec<Attribute>,
    pub is_featured: bool,
}

/// Create/update payload for a product variation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationInput {
    pub product_id: ProductId,
    pub name: String,
    pub value: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub stock: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

/// Create/update payload for a category or sub-category.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_keywords: Option<String>,
    /// Parent category; set for sub-categories only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,
}

/// Create/update payload for a blog post.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogInput {
    pub title: String,
    pub slug: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub categories: Vec<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub published: bool,
}

/// Create/update payload for a coupon.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponInput {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: CouponKind,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub min_purchase: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<u32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
}
