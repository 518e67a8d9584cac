//! Coupon route handlers.
//!
//! Validity dates are entered as calendar days (UTC). A coupon runs from the
//! start of its first day to the end of its last.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use decor_api::requests::CouponInput;
use decor_core::model::Coupon;
use decor_core::slice::Slice;
use decor_core::validation::{ValidationError, ValidationResult, validate_coupon};
use decor_core::{CouponId, CouponKind};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::routes::{
    form_error, into_slice, non_blank, not_found_as, parse_amount, parse_count,
    redirect_with_error, redirect_with_notice,
};
use crate::state::AppState;
use crate::views::{CouponRow, Layout, SelectOption, date_input};

const COUPON_KINDS: [CouponKind; 2] = [CouponKind::Percentage, CouponKind::Fixed];

/// Coupon form as typed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CouponForm {
    pub code: String,
    pub kind: String,
    pub value: String,
    pub min_purchase: String,
    pub max_discount: String,
    pub usage_limit: String,
    /// `YYYY-MM-DD`
    pub valid_from: String,
    /// `YYYY-MM-DD`
    pub valid_until: String,
    /// Checkbox; present when ticked.
    pub is_active: Option<String>,
}

impl Default for CouponForm {
    fn default() -> Self {
        Self {
            code: String::new(),
            kind: CouponKind::Percentage.as_str().to_string(),
            value: String::new(),
            min_purchase: String::new(),
            max_discount: String::new(),
            usage_limit: String::new(),
            valid_from: String::new(),
            valid_until: String::new(),
            is_active: Some("on".to_string()),
        }
    }
}

fn parse_day(field: &'static str, value: &str) -> ValidationResult<Option<NaiveDate>> {
    non_blank(value)
        .map(|v| {
            NaiveDate::parse_from_str(&v, "%Y-%m-%d").map_err(|_| ValidationError::InvalidFormat {
                field,
                reason: "must be a date",
            })
        })
        .transpose()
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    start_of_day(day) + Duration::days(1) - Duration::seconds(1)
}

impl CouponForm {
    #[must_use]
    pub fn from_coupon(coupon: &Coupon) -> Self {
        let amount = |v: Option<rust_decimal::Decimal>| v.map(|v| v.to_string()).unwrap_or_default();
        Self {
            code: coupon.code.clone(),
            kind: coupon.kind.as_str().to_string(),
            value: coupon.value.to_string(),
            min_purchase: amount(coupon.min_purchase),
            max_discount: amount(coupon.max_discount),
            usage_limit: coupon
                .usage_limit
                .map(|l| l.to_string())
                .unwrap_or_default(),
            valid_from: coupon.valid_from.map(date_input).unwrap_or_default(),
            valid_until: coupon.valid_until.map(date_input).unwrap_or_default(),
            is_active: coupon.is_active.then(|| "on".to_string()),
        }
    }

    /// Validate and build the payload. The code is upper-cased.
    ///
    /// # Errors
    ///
    /// Returns the first field that fails validation.
    pub fn to_input(&self) -> ValidationResult<CouponInput> {
        let kind: CouponKind = self.kind.trim().parse().map_err(|_| ValidationError::InvalidFormat {
            field: "type",
            reason: "must be percentage or fixed",
        })?;
        let value = parse_amount("value", &self.value)?.ok_or(ValidationError::Required { field: "value" })?;
        let min_purchase = parse_amount("minimum purchase", &self.min_purchase)?;
        let max_discount = parse_amount("maximum discount", &self.max_discount)?;
        for (field, amount) in [("minimum purchase", min_purchase), ("maximum discount", max_discount)] {
            if amount.is_some_and(|a| a < rust_decimal::Decimal::ZERO) {
                return Err(ValidationError::OutOfRange {
                    field,
                    reason: "cannot be negative",
                });
            }
        }
        let usage_limit = parse_count::<u32>("usage limit", &self.usage_limit)?;
        let valid_from = parse_day("valid from", &self.valid_from)?.map(start_of_day);
        let valid_until = parse_day("valid until", &self.valid_until)?.map(end_of_day);

        let code = validate_coupon(&self.code, kind, value, valid_from, valid_until)?;

        Ok(CouponInput {
            code,
            kind,
            value,
            min_purchase,
            max_discount,
            usage_limit,
            valid_from,
            valid_until,
            is_active: self.is_active.is_some(),
        })
    }

    fn kind_options(&self) -> Vec<SelectOption> {
        COUPON_KINDS
            .iter()
            .map(|k| {
                let label = match k {
                    CouponKind::Percentage => "Percentage off",
                    CouponKind::Fixed => "Fixed amount off",
                };
                SelectOption::new(k.as_str(), label, self.kind.trim())
            })
            .collect()
    }
}

/// Coupon list template.
#[derive(Template, WebTemplate)]
#[template(path = "coupons/index.html")]
pub struct CouponsTemplate {
    pub layout: Layout,
    pub rows: Slice<CouponRow>,
}

/// New/edit coupon form template.
#[derive(Template, WebTemplate)]
#[template(path = "coupons/form.html")]
pub struct CouponFormTemplate {
    pub layout: Layout,
    pub heading: String,
    pub action: String,
    pub kind_options: Vec<SelectOption>,
    pub form: CouponForm,
    pub error: Option<String>,
}

fn render_form(layout: Layout, form: CouponForm, error: Option<String>, id: Option<&CouponId>) -> Response {
    let (heading, action) = match id {
        Some(id) => (format!("Edit {}", form.code), format!("/coupons/{id}")),
        None => ("New coupon".to_string(), "/coupons".to_string()),
    };
    CouponFormTemplate {
        layout,
        heading,
        action,
        kind_options: form.kind_options(),
        form,
        error,
    }
    .into_response()
}

/// List coupons with their current state.
#[instrument(skip(state, admin, layout))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
) -> Result<impl IntoResponse> {
    let now = Utc::now();
    let currency = state.currency();
    let rows = into_slice(state.api().coupons(&admin.backend).await, "coupons")?
        .map(|c| CouponRow::new(&c, now, currency));
    Ok(CouponsTemplate { layout, rows })
}

/// Display the new coupon form.
pub async fn new(RequireAdminAuth(_admin): RequireAdminAuth, layout: Layout) -> Response {
    render_form(layout, CouponForm::default(), None, None)
}

/// Create a coupon.
#[instrument(skip(state, admin, session, layout, form))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    layout: Layout,
    Form(form): Form<CouponForm>,
) -> Result<Response> {
    let error = match form.to_input() {
        Ok(input) => match state.api().create_coupon(&admin.backend, &input).await {
            Ok(coupon) => {
                tracing::info!(coupon_id = %coupon.id, code = %coupon.code, "Coupon created");
                return Ok(redirect_with_notice(
                    &session,
                    format!("Coupon {} created.", coupon.code),
                    "/coupons",
                )
                .await);
            }
            Err(e) => form_error(e)?,
        },
        Err(e) => e.to_string(),
    };
    Ok(render_form(layout, form, Some(error), None))
}

/// Display the edit form.
#[instrument(skip(state, admin, layout))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    layout: Layout,
    Path(id): Path<CouponId>,
) -> Result<Response> {
    let coupon = state
        .api()
        .coupon(&admin.backend, &id)
        .await
        .map_err(not_found_as(format!("coupon {id}")))?;
    Ok(render_form(layout, CouponForm::from_coupon(&coupon), None, Some(&id)))
}

/// Save a coupon.
#[instrument(skip(state, admin, session, layout, form))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    layout: Layout,
    Path(id): Path<CouponId>,
    Form(form): Form<CouponForm>,
) -> Result<Response> {
    let error = match form.to_input() {
        Ok(input) => match state.api().update_coupon(&admin.backend, &id, &input).await {
            Ok(coupon) => {
                tracing::info!(coupon_id = %id, code = %coupon.code, "Coupon updated");
                return Ok(redirect_with_notice(
                    &session,
                    format!("Coupon {} saved.", coupon.code),
                    "/coupons",
                )
                .await);
            }
            Err(e) => form_error(e)?,
        },
        Err(e) => e.to_string(),
    };
    Ok(render_form(layout, form, Some(error), Some(&id)))
}

/// Delete a coupon.
#[instrument(skip(state, admin, session))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    session: Session,
    Path(id): Path<CouponId>,
) -> Result<Response> {
    match state.api().delete_coupon(&admin.backend, &id).await {
        Ok(()) => Ok(redirect_with_notice(&session, "Coupon deleted.", "/coupons").await),
        Err(e) => redirect_with_error(&session, e, "/coupons").await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    use super::*;

    fn form() -> CouponForm {
        CouponForm {
            code: " spring10 ".to_string(),
            value: "10".to_string(),
            valid_from: "2024-03-01".to_string(),
            valid_until: "2024-03-31".to_string(),
            ..CouponForm::default()
        }
    }

    #[test]
    fn test_to_input_normalizes_code_and_dates() {
        let input = form().to_input().unwrap();
        assert_eq!(input.code, "SPRING10");
        assert_eq!(input.kind, CouponKind::Percentage);
        assert_eq!(input.value, Decimal::from(10));
        assert_eq!(
            input.valid_from,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            input.valid_until,
            Some(Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap())
        );
        assert!(input.is_active);
    }

    #[test]
    fn test_single_day_coupon_is_valid() {
        let form = CouponForm {
            valid_until: "2024-03-01".to_string(),
            ..form()
        };
        assert!(form.to_input().is_ok());
    }

    #[test]
    fn test_percentage_over_100_rejected() {
        let pct = CouponForm {
            value: "150".to_string(),
            ..form()
        };
        assert_eq!(pct.to_input().unwrap_err().field(), "value");

        let fixed = CouponForm {
            kind: "fixed".to_string(),
            value: "150".to_string(),
            ..form()
        };
        assert!(fixed.to_input().is_ok());
    }

    #[test]
    fn test_unticked_active_box_deactivates() {
        let form = CouponForm {
            is_active: None,
            ..form()
        };
        assert!(!form.to_input().unwrap().is_active);
    }

    #[test]
    fn test_bad_inputs_name_their_field() {
        let bad_date = CouponForm {
            valid_until: "31/03/2024".to_string(),
            ..form()
        };
        assert_eq!(bad_date.to_input().unwrap_err().field(), "valid until");

        let bad_limit = CouponForm {
            usage_limit: "-5".to_string(),
            ..form()
        };
        assert_eq!(bad_limit.to_input().unwrap_err().field(), "usage limit");
    }

    #[test]
    fn test_form_prefills_from_coupon() {
        let coupon: Coupon = serde_json::from_value(serde_json::json!({
            "_id": "k1", "code": "WELCOME", "type": "fixed", "value": 15,
            "usageLimit": 100, "isActive": false,
            "validUntil": "2024-12-31T23:59:59Z"
        }))
        .unwrap();
        let form = CouponForm::from_coupon(&coupon);
        assert_eq!(form.kind, "fixed");
        assert_eq!(form.usage_limit, "100");
        assert_eq!(form.valid_until, "2024-12-31");
        assert!(form.is_active.is_none());
        assert_eq!(form.kind_options().iter().filter(|o| o.selected).count(), 1);
    }
}
