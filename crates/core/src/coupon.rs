//! Coupon applicability rules.
//!
//! The backend is the authority on whether a coupon applies. These checks let
//! the admin panel label the coupon records it lists.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::checkout::coupon_discount;
use crate::model::Coupon;

/// Why a coupon cannot be used right now.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("this coupon is no longer active")]
    Inactive,
    #[error("this coupon is not valid yet")]
    NotYetValid,
    #[error("this coupon has expired")]
    Expired,
    #[error("this coupon has reached its usage limit")]
    UsageLimitReached,
    #[error("a minimum purchase of {minimum} is required for this coupon")]
    MinimumNotMet { minimum: Decimal },
}

/// Availability of a coupon independent of any cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponState {
    Active,
    Inactive,
    Scheduled,
    Expired,
    Exhausted,
}

impl CouponState {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Scheduled => "Scheduled",
            Self::Expired => "Expired",
            Self::Exhausted => "Used up",
        }
    }
}

impl Coupon {
    /// Check whether the coupon can be applied to `subtotal` at `now`.
    ///
    /// # Errors
    ///
    /// Returns the first [`CouponRejection`] that applies, in the order:
    /// inactive, not yet valid, expired, usage limit, minimum purchase.
    pub fn check(&self, now: DateTime<Utc>, subtotal: Decimal) -> Result<(), CouponRejection> {
        match self.state(now) {
            CouponState::Inactive => return Err(CouponRejection::Inactive),
            CouponState::Scheduled => return Err(CouponRejection::NotYetValid),
            CouponState::Expired => return Err(CouponRejection::Expired),
            CouponState::Exhausted => return Err(CouponRejection::UsageLimitReached),
            CouponState::Active => {}
        }

        if let Some(minimum) = self.min_purchase
            && subtotal < minimum
        {
            return Err(CouponRejection::MinimumNotMet { minimum });
        }

        Ok(())
    }

    /// Availability at `now`, ignoring the minimum purchase.
    #[must_use]
    pub fn state(&self, now: DateTime<Utc>) -> CouponState {
        if !self.is_active {
            return CouponState::Inactive;
        }
        if self.valid_from.is_some_and(|from| now < from) {
            return CouponState::Scheduled;
        }
        if self.valid_until.is_some_and(|until| now > until) {
            return CouponState::Expired;
        }
        if self.usage_limit.is_some_and(|limit| self.used_count >= limit) {
            return CouponState::Exhausted;
        }
        CouponState::Active
    }

    /// Discount this coupon grants on `subtotal`.
    #[must_use]
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        coupon_discount(self.kind, self.value, self.max_discount, subtotal)
    }

    /// Short description such as `15% off (max 40)` or `10 off`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.kind {
            crate::CouponKind::Percentage => match self.max_discount {
                Some(cap) => format!("{}% off (max {cap})", self.value.normalize()),
                None => format!("{}% off", self.value.normalize()),
            },
            crate::CouponKind::Fixed => format!("{} off", self.value.normalize()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::types::{CouponId, CouponKind};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn coupon() -> Coupon {
        Coupon {
            id: CouponId::new("c1"),
            code: "HOME15".to_string(),
            kind: CouponKind::Percentage,
            value: dec("15"),
            min_purchase: Some(dec("50")),
            max_discount: Some(dec("40")),
            usage_limit: Some(100),
            used_count: 3,
            valid_from: Some(now() - Duration::days(1)),
            valid_until: Some(now() + Duration::days(30)),
            is_active: true,
        }
    }

    #[test]
    fn test_active_coupon_applies() {
        assert_eq!(coupon().check(now(), dec("80")), Ok(()));
        assert_eq!(coupon().state(now()), CouponState::Active);
    }

    #[test]
    fn test_rejections_in_order() {
        let mut c = coupon();
        c.is_active = false;
        c.used_count = 100;
        assert_eq!(c.check(now(), dec("80")), Err(CouponRejection::Inactive));

        let mut c = coupon();
        c.valid_from = Some(now() + Duration::hours(1));
        assert_eq!(c.check(now(), dec("80")), Err(CouponRejection::NotYetValid));

        let mut c = coupon();
        c.valid_until = Some(now() - Duration::seconds(1));
        assert_eq!(c.check(now(), dec("80")), Err(CouponRejection::Expired));

        let mut c = coupon();
        c.used_count = 100;
        assert_eq!(
            c.check(now(), dec("80")),
            Err(CouponRejection::UsageLimitReached)
        );

        assert_eq!(
            coupon().check(now(), dec("49.99")),
            Err(CouponRejection::MinimumNotMet { minimum: dec("50") })
        );
    }

    #[test]
    fn test_discount_for_respects_cap() {
        assert_eq!(coupon().discount_for(dec("100")), dec("15"));
        assert_eq!(coupon().discount_for(dec("1000")), dec("40"));
    }

    #[test]
    fn test_describe() {
        assert_eq!(coupon().describe(), "15% off (max 40)");
        let mut c = coupon();
        c.kind = CouponKind::Fixed;
        c.value = dec("10.00");
        assert_eq!(c.describe(), "10 off");
    }
}
