//! Checkout route handlers.
//!
//! Totals shown here come from [`CheckoutSummary`] and are for display only.
//! The order request carries the address, payment method and coupon code; the
//! backend prices the order itself.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use decor_api::ApiError;
use decor_api::requests::{ApplyCoupon, CreateOrder};
use decor_core::PaymentMethod;
use decor_core::checkout::CheckoutSummary;
use decor_core::model::{Address, AppliedCoupon, Cart, ShippingRates};
use decor_core::slice::Notice;
use decor_core::validation::{validate_address, validate_coupon_code};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAuth, push_notice};
use crate::models::{CurrentUser, session_keys};
use crate::routes::cart::remember_cart_count;
use crate::routes::redirect_with_error;
use crate::state::AppState;
use crate::views::{CartLine, Layout, SelectOption, SummaryView};

const PAYMENT_METHODS: [PaymentMethod; 2] = [PaymentMethod::CashOnDelivery, PaymentMethod::Online];

/// Coupon accepted by the backend for this visitor's checkout.
pub async fn applied_coupon(session: &Session) -> Option<AppliedCoupon> {
    session
        .get::<AppliedCoupon>(session_keys::APPLIED_COUPON)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read applied coupon from session");
            None
        })
}

/// Checkout form data. Kept as strings so a rejected form re-renders as typed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    /// Checkbox: bill to a different address.
    pub different_billing: Option<String>,
    pub billing_full_name: String,
    pub billing_phone: String,
    pub billing_line1: String,
    pub billing_line2: String,
    pub billing_city: String,
    pub billing_state: String,
    pub billing_postal_code: String,
    pub billing_country: String,
    pub payment_method: String,
    pub notes: String,
}

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl CheckoutForm {
    #[must_use]
    pub fn has_billing(&self) -> bool {
        self.different_billing.is_some()
    }

    #[must_use]
    pub fn shipping_address(&self) -> Address {
        Address {
            full_name: trimmed(&self.full_name),
            phone: trimmed(&self.phone),
            line1: trimmed(&self.line1),
            line2: optional(&self.line2),
            city: trimmed(&self.city),
            state: trimmed(&self.state),
            postal_code: trimmed(&self.postal_code),
            country: trimmed(&self.country),
        }
    }

    #[must_use]
    pub fn billing_address(&self) -> Option<Address> {
        self.has_billing().then(|| Address {
            full_name: trimmed(&self.billing_full_name),
            phone: trimmed(&self.billing_phone),
            line1: trimmed(&self.billing_line1),
            line2: optional(&self.billing_line2),
            city: trimmed(&self.billing_city),
            state: trimmed(&self.billing_state),
            postal_code: trimmed(&self.billing_postal_code),
            country: trimmed(&self.billing_country),
        })
    }

    fn payment_options(&self) -> Vec<SelectOption> {
        let current = if self.payment_method.is_empty() {
            PaymentMethod::default().as_str()
        } else {
            self.payment_method.as_str()
        };
        PAYMENT_METHODS
            .iter()
            .map(|m| SelectOption::new(m.as_str(), m.label(), Some(current)))
            .collect()
    }
}

/// Apply coupon form data.
#[derive(Debug, Deserialize)]
pub struct CouponForm {
    pub code: String,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub lines: Vec<CartLine>,
    pub summary: SummaryView,
    pub coupon_code: Option<String>,
    pub form: CheckoutForm,
    pub payment_options: Vec<SelectOption>,
    pub error: Option<String>,
}

/// Cart, rates and coupon for this visitor.
async fn load_checkout(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
) -> Result<(Cart, ShippingRates, Option<AppliedCoupon>)> {
    let (cart, rates) = tokio::join!(
        state.api().cart(&user.backend),
        state.api().shipping_rates(),
    );
    let cart = cart?;
    let rates = rates.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load shipping rates");
        ShippingRates::default()
    });
    Ok((cart, rates, applied_coupon(session).await))
}

fn render(
    state: &AppState,
    layout: Layout,
    (cart, rates, coupon): (Cart, ShippingRates, Option<AppliedCoupon>),
    form: CheckoutForm,
    error: Option<String>,
) -> CheckoutTemplate {
    let currency = state.currency();
    let summary = CheckoutSummary::for_cart(&cart, coupon.as_ref(), &rates);
    CheckoutTemplate {
        layout,
        lines: cart.items.iter().map(|item| CartLine::new(item, currency)).collect(),
        summary: SummaryView::new(&summary, &rates, currency),
        coupon_code: coupon.map(|c| c.code),
        payment_options: form.payment_options(),
        form,
        error,
    }
}

/// Display checkout page.
#[instrument(skip(state, user, session, layout))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    layout: Layout,
) -> Result<Response> {
    let loaded = load_checkout(&state, &session, &user).await?;
    if loaded.0.is_empty() {
        push_notice(&session, Notice::info("Your cart is empty")).await;
        return Ok(Redirect::to("/cart").into_response());
    }

    let form = CheckoutForm {
        full_name: user.name.clone(),
        ..CheckoutForm::default()
    };
    Ok(render(&state, layout, loaded, form, None).into_response())
}

/// Apply a coupon code to the checkout.
#[instrument(skip(state, user, session))]
pub async fn apply_coupon(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<CouponForm>,
) -> Result<Response> {
    let code = match validate_coupon_code(&form.code) {
        Ok(code) => code,
        Err(e) => return redirect_with_error(&session, e, "/checkout").await,
    };

    let cart = match state.api().cart(&user.backend).await {
        Ok(cart) => cart,
        Err(e) => return redirect_with_error(&session, e, "/checkout").await,
    };
    if cart.is_empty() {
        push_notice(&session, Notice::info("Add something to your cart first")).await;
        return Ok(Redirect::to("/cart").into_response());
    }

    let subtotal = CheckoutSummary::for_cart(&cart, None, &ShippingRates::default()).subtotal;
    let request = ApplyCoupon {
        code: &code,
        cart_total: subtotal,
    };
    let coupon = match state.api().apply_coupon(&user.backend, &request).await {
        Ok(coupon) => coupon,
        Err(e) => return redirect_with_error(&session, e, "/checkout").await,
    };

    session
        .insert(session_keys::APPLIED_COUPON, &coupon)
        .await?;
    add_breadcrumb("checkout", "Coupon applied", Some(&[("code", coupon.code.as_str())]));
    push_notice(&session, Notice::success(format!("Coupon {} applied", coupon.code))).await;
    Ok(Redirect::to("/checkout").into_response())
}

/// Drop the applied coupon.
#[instrument(skip(_user, session))]
pub async fn remove_coupon(RequireAuth(_user): RequireAuth, session: Session) -> Result<Response> {
    session
        .remove::<AppliedCoupon>(session_keys::APPLIED_COUPON)
        .await?;
    push_notice(&session, Notice::info("Coupon removed")).await;
    Ok(Redirect::to("/checkout").into_response())
}

/// Place the order.
///
/// A rejected address or a backend refusal re-renders the form with what was
/// typed.
#[instrument(skip(state, user, session, layout, form))]
pub async fn place_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    layout: Layout,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let loaded = load_checkout(&state, &session, &user).await?;
    if loaded.0.is_empty() {
        push_notice(&session, Notice::info("Your cart is empty")).await;
        return Ok(Redirect::to("/cart").into_response());
    }

    let shipping = form.shipping_address();
    let billing = form.billing_address();
    let checked = validate_address(&shipping)
        .and_then(|()| billing.as_ref().map_or(Ok(()), validate_address))
        .map_err(AppError::from)
        .and_then(|()| {
            form.payment_method
                .parse::<PaymentMethod>()
                .map_err(|_| AppError::BadRequest("Choose a payment method".to_string()))
        });
    let payment_method = match checked {
        Ok(method) => method,
        Err(e) => {
            let message = e.user_message();
            return Ok(render(&state, layout, loaded, form, Some(message)).into_response());
        }
    };

    let notes = optional(&form.notes);
    let coupon_code = loaded.2.as_ref().map(|c| c.code.clone());
    let request = CreateOrder {
        shipping_address: &shipping,
        billing_address: billing.as_ref(),
        payment_method,
        coupon_code: coupon_code.as_deref(),
        notes: notes.as_deref(),
    };

    let order = match state.api().create_order(&user.backend, &request).await {
        Ok(order) => order,
        Err(ApiError::Unauthorized) => return Err(AppError::Api(ApiError::Unauthorized)),
        Err(e) => {
            if !e.is_client_error() {
                tracing::warn!(error = %e, "Order placement failed");
            }
            let message = e.user_message();
            return Ok(render(&state, layout, loaded, form, Some(message)).into_response());
        }
    };

    session
        .remove::<AppliedCoupon>(session_keys::APPLIED_COUPON)
        .await?;
    remember_cart_count(&session, 0).await;
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order.id.as_str())]));
    tracing::info!(order_id = %order.id, "Order placed");

    push_notice(
        &session,
        Notice::success(format!("Thank you! Order {} is placed.", order.reference())),
    )
    .await;
    Ok(Redirect::to(&format!("/account/orders/{}", order.id)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> CheckoutForm {
        CheckoutForm {
            full_name: " Ada Lovelace ".to_string(),
            phone: "+1 555 010 2030".to_string(),
            line1: "12 Loom Street".to_string(),
            line2: "  ".to_string(),
            city: "Portland".to_string(),
            state: "OR".to_string(),
            postal_code: "97201".to_string(),
            country: "US".to_string(),
            payment_method: "online".to_string(),
            ..CheckoutForm::default()
        }
    }

    #[test]
    fn test_shipping_address_is_trimmed() {
        let address = filled_form().shipping_address();
        assert_eq!(address.full_name, "Ada Lovelace");
        assert_eq!(address.line2, None);
        assert!(validate_address(&address).is_ok());
    }

    #[test]
    fn test_billing_address_only_when_requested() {
        let mut form = filled_form();
        assert!(form.billing_address().is_none());

        form.different_billing = Some("on".to_string());
        form.billing_line1 = "1 Office Park".to_string();
        let billing = form.billing_address();
        assert_eq!(billing.map(|a| a.line1), Some("1 Office Park".to_string()));
    }

    #[test]
    fn test_payment_options_default_to_cash_on_delivery() {
        let selected: Vec<String> = CheckoutForm::default()
            .payment_options()
            .into_iter()
            .filter(|o| o.selected)
            .map(|o| o.value)
            .collect();
        assert_eq!(selected, vec!["cash_on_delivery".to_string()]);

        let selected: Vec<String> = filled_form()
            .payment_options()
            .into_iter()
            .filter(|o| o.selected)
            .map(|o| o.value)
            .collect();
        assert_eq!(selected, vec!["online".to_string()]);
    }
}
