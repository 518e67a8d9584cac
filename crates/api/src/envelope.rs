//! Response envelope handling.
//!
//! Most backend routes answer `{"success": bool, "message": "...", "data": ...}`.
//! Some answer with the payload next to `success` instead of under `data`
//! (`{"success": true, "user": {...}}`, `{"success": true, "products": [...],
//! "total": 3}`), and a few answer with bare JSON. All three shapes are
//! accepted here.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ApiError;

const SUCCESS: &str = "success";
const MESSAGE: &str = "message";
const DATA: &str = "data";

/// Decode a successful (2xx) response body into `T`.
///
/// # Errors
///
/// - [`ApiError::Rejected`] when the envelope says `success: false`.
/// - [`ApiError::MissingData`] when a success envelope carries nothing usable.
/// - [`ApiError::Parse`] when the body is not JSON or has the wrong shape.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    if body.trim().is_empty() {
        return from_value(Value::Null).map_err(|_| ApiError::MissingData);
    }

    let value: Value = serde_json::from_str(body).map_err(|e| ApiError::Parse(e.to_string()))?;

    let Value::Object(mut object) = value else {
        return from_value(value);
    };

    let Some(success) = object.get(SUCCESS).and_then(Value::as_bool) else {
        return from_value(Value::Object(object));
    };

    if !success {
        return Err(ApiError::Rejected(
            message_of(&object).unwrap_or_else(|| "Request failed".to_string()),
        ));
    }

    if let Some(data) = object.remove(DATA) {
        return from_value(data);
    }

    object.remove(SUCCESS);
    object.remove(MESSAGE);

    if object.len() == 1 {
        let only = object.values().next().cloned().unwrap_or(Value::Null);
        if let Ok(decoded) = serde_json::from_value(only) {
            return Ok(decoded);
        }
    }

    if !object.is_empty()
        && let Ok(decoded) = serde_json::from_value(Value::Object(object))
    {
        return Ok(decoded);
    }

    serde_json::from_value(Value::Null).map_err(|_| ApiError::MissingData)
}

/// Pull a human-readable message out of an error body.
#[must_use]
pub fn error_message(body: &str) -> Option<String> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(object)) => message_of(&object),
        _ => {
            let text = body.trim();
            (!text.is_empty() && !text.starts_with('<'))
                .then(|| text.chars().take(200).collect())
        }
    }
}

fn message_of(object: &Map<String, Value>) -> Option<String> {
    [MESSAGE, "error"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::to_owned)
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Parse(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Named {
        name: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Listing {
        products: Vec<Named>,
        total: u32,
    }

    #[test]
    fn test_data_field() {
        let got: Vec<Named> =
            decode(r#"{"success":true,"data":[{"name":"Lamp"}]}"#).unwrap();
        assert_eq!(got, vec![Named { name: "Lamp".into() }]);
    }

    #[test]
    fn test_single_sibling_field() {
        let got: Named =
            decode(r#"{"success":true,"message":"ok","user":{"name":"Ada"}}"#).unwrap();
        assert_eq!(got.name, "Ada");
    }

    #[test]
    fn test_flattened_payload() {
        let got: Listing =
            decode(r#"{"success":true,"products":[{"name":"Rug"}],"total":1}"#).unwrap();
        assert_eq!(got.total, 1);
        assert_eq!(got.products.len(), 1);
    }

    #[test]
    fn test_bare_json() {
        let got: Vec<Named> = decode(r#"[{"name":"Vase"}]"#).unwrap();
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn test_unit_payloads() {
        decode::<()>(r#"{"success":true,"message":"Removed"}"#).unwrap();
        decode::<()>("").unwrap();
    }

    #[test]
    fn test_success_false_is_an_error() {
        let err = decode::<Named>(r#"{"success":false,"message":"Coupon expired"}"#)
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref message) if message == "Coupon expired"));
        assert!(err.is_client_error());
        assert_eq!(err.user_message(), "Coupon expired");
    }

    #[test]
    fn test_missing_data() {
        let err = decode::<Vec<Named>>(r#"{"success":true}"#).unwrap_err();
        assert!(matches!(err, ApiError::MissingData));
    }

    #[test]
    fn test_error_message() {
        assert_eq!(error_message(r#"{"message":"Invalid credentials"}"#).as_deref(), Some("Invalid credentials"));
        assert_eq!(error_message(r#"{"error":"Bad token"}"#).as_deref(), Some("Bad token"));
        assert_eq!(error_message("Service Unavailable").as_deref(), Some("Service Unavailable"));
        assert_eq!(error_message("<html>oops</html>"), None);
    }
}
