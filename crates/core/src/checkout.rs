//! Display-only checkout totals.
//!
//! The storefront shows a subtotal/discount/shipping/tax breakdown before the
//! customer places an order. The backend recomputes every number when the
//! order is created; nothing computed here is ever sent as an amount.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::{AppliedCoupon, Cart, ShippingRates};
use crate::types::{CouponKind, round_money};

/// Price one unit sells for: the discount price when it is positive and below
/// the list price, otherwise the list price.
#[must_use]
pub fn unit_price(price: Decimal, discount_price: Option<Decimal>) -> Decimal {
    match discount_price {
        Some(discounted) if discounted > Decimal::ZERO && discounted < price => discounted,
        _ => price,
    }
}

/// Discount a coupon grants on `subtotal`, never more than the subtotal.
#[must_use]
pub fn coupon_discount(
    kind: CouponKind,
    value: Decimal,
    max_discount: Option<Decimal>,
    subtotal: Decimal,
) -> Decimal {
    if subtotal <= Decimal::ZERO || value <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let raw = match kind {
        CouponKind::Percentage => {
            let pct = subtotal * value / Decimal::ONE_HUNDRED;
            max_discount.map_or(pct, |cap| pct.min(cap))
        }
        CouponKind::Fixed => value,
    };

    round_money(raw.min(subtotal))
}

/// A priced cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl Line {
    #[must_use]
    pub const fn new(unit_price: Decimal, quantity: u32) -> Self {
        Self {
            unit_price,
            quantity,
        }
    }
}

/// Checkout breakdown shown next to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CheckoutSummary {
    pub item_count: u32,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl CheckoutSummary {
    /// Compute totals for `lines` with an optional applied coupon.
    #[must_use]
    pub fn compute(lines: &[Line], coupon: Option<&AppliedCoupon>, rates: &ShippingRates) -> Self {
        let item_count = lines.iter().map(|l| l.quantity).sum::<u32>();
        let subtotal = round_money(
            lines
                .iter()
                .map(|l| l.unit_price * Decimal::from(l.quantity))
                .sum::<Decimal>(),
        );

        let discount = coupon.map_or(Decimal::ZERO, |c| {
            coupon_discount(c.kind, c.value, c.max_discount, subtotal)
        });
        let discounted = subtotal - discount;

        let shipping = if item_count == 0 {
            Decimal::ZERO
        } else {
            match rates.free_shipping_threshold {
                Some(threshold) if discounted >= threshold => Decimal::ZERO,
                _ => round_money(rates.shipping_cost.max(Decimal::ZERO)),
            }
        };

        let tax = round_money(discounted * rates.tax_rate / Decimal::ONE_HUNDRED);
        let total = discounted + shipping + tax;

        Self {
            item_count,
            subtotal,
            discount,
            shipping,
            tax,
            total,
        }
    }

    /// Compute totals for a fetched backend cart.
    #[must_use]
    pub fn for_cart(cart: &Cart, coupon: Option<&AppliedCoupon>, rates: &ShippingRates) -> Self {
        let lines: Vec<Line> = cart
            .items
            .iter()
            .map(|item| Line::new(item.unit_price(), item.quantity))
            .collect();
        Self::compute(&lines, coupon, rates)
    }

    /// Amount still needed to qualify for free shipping, if any.
    #[must_use]
    pub fn until_free_shipping(&self, rates: &ShippingRates) -> Option<Decimal> {
        let threshold = rates.free_shipping_threshold?;
        let remaining = threshold - (self.subtotal - self.discount);
        (self.item_count > 0 && remaining > Decimal::ZERO).then_some(remaining)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn rates(cost: &str, threshold: Option<&str>, tax: &str) -> ShippingRates {
        ShippingRates {
            shipping_cost: dec(cost),
            free_shipping_threshold: threshold.map(dec),
            tax_rate: dec(tax),
        }
    }

    fn coupon(kind: CouponKind, value: &str, cap: Option<&str>) -> AppliedCoupon {
        AppliedCoupon {
            code: "WELCOME".to_string(),
            kind,
            value: dec(value),
            max_discount: cap.map(dec),
            discount: None,
        }
    }

    #[test]
    fn test_unit_price_ignores_invalid_discounts() {
        assert_eq!(unit_price(dec("50"), Some(dec("40"))), dec("40"));
        assert_eq!(unit_price(dec("50"), Some(dec("60"))), dec("50"));
        assert_eq!(unit_price(dec("50"), Some(dec("0"))), dec("50"));
        assert_eq!(unit_price(dec("50"), None), dec("50"));
    }

    #[test]
    fn test_summary_without_coupon() {
        let lines = [Line::new(dec("24.99"), 2), Line::new(dec("10.00"), 1)];
        let summary = CheckoutSummary::compute(&lines, None, &rates("7.50", Some("100"), "8"));

        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.subtotal, dec("59.98"));
        assert_eq!(summary.discount, dec("0"));
        assert_eq!(summary.shipping, dec("7.50"));
        // 59.98 * 8% = 4.7984
        assert_eq!(summary.tax, dec("4.80"));
        assert_eq!(summary.total, dec("72.28"));
    }

    #[test]
    fn test_percentage_coupon_is_capped() {
        let lines = [Line::new(dec("300"), 1)];
        let summary = CheckoutSummary::compute(
            &lines,
            Some(&coupon(CouponKind::Percentage, "20", Some("50"))),
            &rates("0", None, "0"),
        );
        assert_eq!(summary.discount, dec("50"));
        assert_eq!(summary.total, dec("250"));
    }

    #[test]
    fn test_fixed_coupon_never_exceeds_subtotal() {
        let lines = [Line::new(dec("15"), 1)];
        let summary = CheckoutSummary::compute(
            &lines,
            Some(&coupon(CouponKind::Fixed, "25", None)),
            &rates("5", None, "10"),
        );
        assert_eq!(summary.discount, dec("15"));
        assert_eq!(summary.tax, dec("0"));
        assert_eq!(summary.total, dec("5"));
    }

    #[test]
    fn test_free_shipping_threshold_applies_after_discount() {
        let lines = [Line::new(dec("110"), 1)];
        let free = rates("9.99", Some("100"), "0");

        let summary = CheckoutSummary::compute(&lines, None, &free);
        assert_eq!(summary.shipping, dec("0"));

        let summary = CheckoutSummary::compute(
            &lines,
            Some(&coupon(CouponKind::Percentage, "20", None)),
            &free,
        );
        assert_eq!(summary.discount, dec("22"));
        assert_eq!(summary.shipping, dec("9.99"));
        assert_eq!(summary.until_free_shipping(&free), Some(dec("12")));
    }

    #[test]
    fn test_empty_cart_has_no_shipping() {
        let summary = CheckoutSummary::compute(&[], None, &rates("9.99", None, "8"));
        assert_eq!(summary, CheckoutSummary::default());
    }
}
