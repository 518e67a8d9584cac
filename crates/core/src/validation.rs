//! Form validation.
//!
//! Shallow checks run before a form is submitted to the backend. They catch
//! obvious mistakes with a readable message; the backend still validates
//! everything it receives.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::model::Address;
use crate::types::{CouponKind, Email, EmailError};

/// Maximum length of a product name or blog title.
pub const MAX_TITLE_LEN: usize = 200;
/// Maximum length of a category or sub-category name.
pub const MAX_CATEGORY_NAME_LEN: usize = 120;
/// Largest quantity of one line in the cart.
pub const MAX_QUANTITY: i64 = 99;
/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 8;

/// A form field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} {reason}")]
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },

    #[error("{field} {reason}")]
    OutOfRange {
        field: &'static str,
        reason: &'static str,
    },

    #[error(transparent)]
    Email(#[from] EmailError),
}

impl ValidationError {
    /// The offending field.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Required { field }
            | Self::TooLong { field, .. }
            | Self::TooShort { field, .. }
            | Self::InvalidFormat { field, .. }
            | Self::OutOfRange { field, .. } => field,
            Self::Email(_) => "email",
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Require a non-blank value of at most `max` characters. Returns it trimmed.
///
/// # Errors
///
/// [`ValidationError::Required`] when blank, [`ValidationError::TooLong`]
/// when longer than `max`.
pub fn validate_text<'a>(field: &'static str, value: &'a str, max: usize) -> ValidationResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required { field });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(value)
}

/// Product form: name, price, optional sale price and stock.
///
/// # Errors
///
/// Returns the first failing field.
pub fn validate_product(
    name: &str,
    price: Decimal,
    discount_price: Option<Decimal>,
    stock: i64,
) -> ValidationResult<()> {
    validate_text("name", name, MAX_TITLE_LEN)?;

    if price <= Decimal::ZERO {
        return Err(ValidationError::OutOfRange {
            field: "price",
            reason: "must be greater than zero",
        });
    }

    if let Some(discounted) = discount_price {
        if discounted <= Decimal::ZERO {
            return Err(ValidationError::OutOfRange {
                field: "discount price",
                reason: "must be greater than zero",
            });
        }
        if discounted >= price {
            return Err(ValidationError::OutOfRange {
                field: "discount price",
                reason: "must be lower than the price",
            });
        }
    }

    if stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock",
            reason: "cannot be negative",
        });
    }

    Ok(())
}

/// Category or sub-category name.
///
/// # Errors
///
/// See [`validate_text`].
pub fn validate_category_name(name: &str) -> ValidationResult<&str> {
    validate_text("name", name, MAX_CATEGORY_NAME_LEN)
}

/// Blog post title.
///
/// # Errors
///
/// See [`validate_text`].
pub fn validate_blog_title(title: &str) -> ValidationResult<&str> {
    validate_text("title", title, MAX_TITLE_LEN)
}

/// Normalize and check a coupon code: upper-cased, 3-20 of `A-Z 0-9 - _`.
///
/// # Errors
///
/// Returns an error when the code is blank, too short, too long or contains
/// other characters.
pub fn validate_coupon_code(code: &str) -> ValidationResult<String> {
    const FIELD: &str = "code";
    let code = code.trim().to_ascii_uppercase();

    if code.is_empty() {
        return Err(ValidationError::Required { field: FIELD });
    }
    if code.len() < 3 {
        return Err(ValidationError::TooShort { field: FIELD, min: 3 });
    }
    if code.len() > 20 {
        return Err(ValidationError::TooLong { field: FIELD, max: 20 });
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: FIELD,
            reason: "may only contain letters, numbers, hyphens and underscores",
        });
    }

    Ok(code)
}

/// Coupon form. Returns the normalized code.
///
/// # Errors
///
/// Returns the first failing field.
pub fn validate_coupon(
    code: &str,
    kind: CouponKind,
    value: Decimal,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
) -> ValidationResult<String> {
    let code = validate_coupon_code(code)?;

    if value <= Decimal::ZERO {
        return Err(ValidationError::OutOfRange {
            field: "value",
            reason: "must be greater than zero",
        });
    }
    if kind == CouponKind::Percentage && value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: "value",
            reason: "cannot exceed 100 percent",
        });
    }

    if let (Some(from), Some(until)) = (valid_from, valid_until)
        && from >= until
    {
        return Err(ValidationError::OutOfRange {
            field: "valid until",
            reason: "must be after the start date",
        });
    }

    Ok(code)
}

/// Phone number: 7-15 digits, optional leading `+`, spaces and dashes ignored.
///
/// # Errors
///
/// Returns an error for blank or malformed numbers.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    const FIELD: &str = "phone";
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(ValidationError::Required { field: FIELD });
    }

    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let mut count = 0;
    for c in digits.chars() {
        match c {
            '0'..='9' => count += 1,
            ' ' | '-' => {}
            _ => {
                return Err(ValidationError::InvalidFormat {
                    field: FIELD,
                    reason: "may only contain digits, spaces and dashes",
                });
            }
        }
    }

    if !(7..=15).contains(&count) {
        return Err(ValidationError::InvalidFormat {
            field: FIELD,
            reason: "must have between 7 and 15 digits",
        });
    }
    Ok(())
}

/// Postal code: 3-10 letters or digits, spaces and dashes ignored.
///
/// # Errors
///
/// Returns an error for blank or malformed codes.
pub fn validate_postal_code(code: &str) -> ValidationResult<()> {
    const FIELD: &str = "postal code";
    let code = code.trim();
    if code.is_empty() {
        return Err(ValidationError::Required { field: FIELD });
    }

    let mut count = 0;
    for c in code.chars() {
        if c.is_ascii_alphanumeric() {
            count += 1;
        } else if c != ' ' && c != '-' {
            return Err(ValidationError::InvalidFormat {
                field: FIELD,
                reason: "may only contain letters and digits",
            });
        }
    }

    if !(3..=10).contains(&count) {
        return Err(ValidationError::InvalidFormat {
            field: FIELD,
            reason: "must have between 3 and 10 characters",
        });
    }
    Ok(())
}

/// Shipping address.
///
/// # Errors
///
/// Returns the first failing field.
pub fn validate_address(address: &Address) -> ValidationResult<()> {
    validate_text("full name", &address.full_name, 120)?;
    validate_phone(&address.phone)?;
    validate_text("address line 1", &address.line1, 200)?;
    validate_text("city", &address.city, 120)?;
    validate_text("state", &address.state, 120)?;
    validate_postal_code(&address.postal_code)?;
    validate_text("country", &address.country, 120)?;
    Ok(())
}

/// Cart quantity between 1 and [`MAX_QUANTITY`].
///
/// # Errors
///
/// Returns [`ValidationError::OutOfRange`] outside that range.
pub fn validate_quantity(quantity: i64) -> ValidationResult<u32> {
    if quantity < 1 {
        return Err(ValidationError::OutOfRange {
            field: "quantity",
            reason: "must be at least 1",
        });
    }
    if quantity > MAX_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity",
            reason: "cannot exceed 99",
        });
    }
    u32::try_from(quantity).map_err(|_| ValidationError::OutOfRange {
        field: "quantity",
        reason: "cannot exceed 99",
    })
}

/// Password length check.
///
/// # Errors
///
/// Returns an error for blank or short passwords.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required { field: "password" });
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password",
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// Registration form. Returns the parsed email.
///
/// # Errors
///
/// Returns the first failing field.
pub fn validate_registration(name: &str, email: &str, password: &str) -> ValidationResult<Email> {
    validate_text("name", name, 120)?;
    let email = Email::parse(email)?;
    validate_password(password)?;
    Ok(email)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use chrono::TimeZone;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn address() -> Address {
        Address {
            full_name: "Ada Lovelace".to_string(),
            phone: "+1 555-010-0199".to_string(),
            line1: "12 Elm Row".to_string(),
            line2: None,
            city: "Portland".to_string(),
            state: "OR".to_string(),
            postal_code: "97201".to_string(),
            country: "US".to_string(),
        }
    }

    #[test]
    fn test_product_rules() {
        assert!(validate_product("Oak Stool", dec("89"), Some(dec("69")), 4).is_ok());
        assert_eq!(
            validate_product("  ", dec("89"), None, 0),
            Err(ValidationError::Required { field: "name" })
        );
        assert_eq!(
            validate_product(&"x".repeat(201), dec("89"), None, 0).unwrap_err().field(),
            "name"
        );
        assert_eq!(
            validate_product("Stool", dec("0"), None, 0).unwrap_err().field(),
            "price"
        );
        assert_eq!(
            validate_product("Stool", dec("50"), Some(dec("50")), 0).unwrap_err().field(),
            "discount price"
        );
        assert_eq!(
            validate_product("Stool", dec("50"), None, -1).unwrap_err().field(),
            "stock"
        );
    }

    #[test]
    fn test_name_limits() {
        assert_eq!(validate_category_name(" Lighting ").unwrap(), "Lighting");
        assert!(validate_category_name(&"a".repeat(121)).is_err());
        assert!(validate_blog_title(&"a".repeat(200)).is_ok());
        assert!(validate_blog_title("").is_err());
    }

    #[test]
    fn test_coupon_code_is_normalized() {
        assert_eq!(validate_coupon_code(" spring_25 ").unwrap(), "SPRING_25");
        assert!(validate_coupon_code("AB").is_err());
        assert!(validate_coupon_code(&"A".repeat(21)).is_err());
        assert!(validate_coupon_code("SAVE 10").is_err());
    }

    #[test]
    fn test_coupon_rules() {
        let from = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();

        assert!(validate_coupon("SUMMER", CouponKind::Percentage, dec("15"), Some(from), Some(until)).is_ok());
        assert!(validate_coupon("SUMMER", CouponKind::Percentage, dec("101"), None, None).is_err());
        assert!(validate_coupon("SUMMER", CouponKind::Fixed, dec("150"), None, None).is_ok());
        assert!(validate_coupon("SUMMER", CouponKind::Fixed, dec("0"), None, None).is_err());
        assert_eq!(
            validate_coupon("SUMMER", CouponKind::Fixed, dec("5"), Some(until), Some(from))
                .unwrap_err()
                .field(),
            "valid until"
        );
    }

    #[test]
    fn test_address_rules() {
        assert!(validate_address(&address()).is_ok());

        let mut a = address();
        a.phone = "12345".to_string();
        assert_eq!(validate_address(&a).unwrap_err().field(), "phone");

        let mut a = address();
        a.phone = "555 0100 ext".to_string();
        assert_eq!(validate_address(&a).unwrap_err().field(), "phone");

        let mut a = address();
        a.postal_code = "SW1A 1AA".to_string();
        assert!(validate_address(&a).is_ok());
        a.postal_code = "12".to_string();
        assert_eq!(validate_address(&a).unwrap_err().field(), "postal code");

        let mut a = address();
        a.city = String::new();
        assert_eq!(
            validate_address(&a),
            Err(ValidationError::Required { field: "city" })
        );
    }

    #[test]
    fn test_quantity_bounds() {
        assert_eq!(validate_quantity(1).unwrap(), 1);
        assert_eq!(validate_quantity(99).unwrap(), 99);
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(100).is_err());
        assert!(validate_quantity(-3).is_err());
    }

    #[test]
    fn test_registration() {
        let email = validate_registration("Ada", "Ada@Example.COM", "correct horse").unwrap();
        assert_eq!(email.as_str(), "Ada@example.com");
        assert_eq!(
            validate_registration("Ada", "ada@example.com", "short").unwrap_err(),
            ValidationError::TooShort {
                field: "password",
                min: 8
            }
        );
        assert_eq!(
            validate_registration("Ada", "not-an-email", "long enough").unwrap_err().field(),
            "email"
        );
        assert_eq!(
            ValidationError::Required { field: "name" }.to_string(),
            "name is required"
        );
    }
}
