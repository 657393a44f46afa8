//! Request field parsing shared by the JSON handlers.
//!
//! The dashboards send ids and prices sometimes as JSON numbers and
//! sometimes as strings, so numeric fields are accepted in either form and
//! checked here rather than by serde.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::models::MAX_CART_QUANTITY;

/// A JSON scalar that may be a number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Loose {
    Number(serde_json::Number),
    Text(String),
    Bool(bool),
}

impl Loose {
    /// Trimmed, non-empty text form.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let text = match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
            Self::Bool(_) => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    /// Whole number form; `"3"`, `3` and `3.0` all give 3.
    #[must_use]
    pub fn integer(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .and_then(|f| Decimal::from_str(&f.to_string()).ok())
                    .and_then(|d| i64::try_from(d).ok())
            }),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    #[must_use]
    pub fn decimal(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .ok(),
            Self::Text(s) => Decimal::from_str(s.trim()).ok(),
            Self::Bool(_) => None,
        }
    }

    #[must_use]
    pub fn boolean(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Number(_) => None,
        }
    }
}

/// A strictly positive integer, or 400 with `msg`.
pub fn positive_int(value: Option<&Loose>, msg: &str) -> Result<i64, AppError> {
    value
        .and_then(Loose::integer)
        .filter(|n| *n > 0)
        .ok_or_else(|| AppError::BadRequest(msg.to_string()))
}

/// A strictly positive `i32` id, or 400 with `msg`.
pub fn positive_id(value: Option<&Loose>, msg: &str) -> Result<i32, AppError> {
    positive_int(value, msg)
        .and_then(|n| i32::try_from(n).map_err(|_| AppError::BadRequest(msg.to_string())))
}

/// Parse a path segment as a strictly positive integer.
pub fn positive_segment(segment: &str, msg: &str) -> Result<i64, AppError> {
    segment
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| AppError::BadRequest(msg.to_string()))
}

/// Parse a path segment as a row id.
pub fn id_segment(segment: &str, msg: &str) -> Result<i32, AppError> {
    positive_segment(segment, msg)
        .and_then(|n| i32::try_from(n).map_err(|_| AppError::BadRequest(msg.to_string())))
}

/// A non-empty string, or 400 with `msg`.
pub fn required_text(value: Option<&Loose>, msg: &str) -> Result<String, AppError> {
    value
        .and_then(Loose::text)
        .ok_or_else(|| AppError::BadRequest(msg.to_string()))
}

/// An optional quantity: absent means 1, present must be a positive `i32`.
pub fn quantity_or_one(value: Option<&Loose>) -> Result<i32, AppError> {
    match value {
        None => Ok(1),
        Some(v) => v
            .integer()
            .filter(|n| *n > 0)
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| AppError::BadRequest("Quantity must be a positive number".to_string())),
    }
}

/// Reject cart quantities above [`MAX_CART_QUANTITY`].
pub fn cart_limit(quantity: i32) -> Result<i32, AppError> {
    if quantity > MAX_CART_QUANTITY {
        return Err(AppError::BadRequest(format!(
            "Quantity cannot exceed {MAX_CART_QUANTITY}"
        )));
    }
    Ok(quantity)
}

/// A boolean flag that defaults to `false`.
#[must_use]
pub fn flag(value: Option<&Loose>) -> bool {
    value.and_then(Loose::boolean).unwrap_or(false)
}

/// Parse a JSON body that may be missing entirely.
pub fn optional_json<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))
}

/// Trim an optional string, mapping blank to `None`.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn loose(value: serde_json::Value) -> Loose {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_numbers_and_strings_agree() {
        assert_eq!(loose(json!(7)).integer(), Some(7));
        assert_eq!(loose(json!("7")).integer(), Some(7));
        assert_eq!(loose(json!(7.0)).integer(), Some(7));
        assert_eq!(loose(json!(7.5)).integer(), None);
        assert_eq!(loose(json!("abc")).integer(), None);
    }

    #[test]
    fn test_decimal_keeps_cents() {
        assert_eq!(loose(json!("24.99")).decimal(), Some(Decimal::new(2499, 2)));
        assert_eq!(loose(json!(24.99)).decimal(), Some(Decimal::new(2499, 2)));
    }

    #[test]
    fn test_positive_int_rejects_zero_and_missing() {
        assert!(positive_int(Some(&loose(json!(0))), "bad").is_err());
        assert!(positive_int(Some(&loose(json!(-3))), "bad").is_err());
        assert!(positive_int(None, "bad").is_err());
        assert_eq!(positive_int(Some(&loose(json!("12"))), "bad").unwrap(), 12);
    }

    #[test]
    fn test_quantity_defaults_to_one() {
        assert_eq!(quantity_or_one(None).unwrap(), 1);
        assert_eq!(quantity_or_one(Some(&loose(json!(4)))).unwrap(), 4);
        assert!(quantity_or_one(Some(&loose(json!(0)))).is_err());
    }

    #[test]
    fn test_cart_limit() {
        assert_eq!(cart_limit(MAX_CART_QUANTITY).unwrap(), MAX_CART_QUANTITY);
        assert!(cart_limit(MAX_CART_QUANTITY + 1).is_err());
        assert!(cart_limit(i32::MAX).is_err());
    }

    #[test]
    fn test_required_text_trims() {
        assert!(required_text(Some(&loose(json!("   "))), "bad").is_err());
        assert_eq!(
            required_text(Some(&loose(json!(" tee "))), "bad").unwrap(),
            "tee"
        );
    }

    #[test]
    fn test_positive_segment() {
        assert_eq!(positive_segment("42", "bad").unwrap(), 42);
        assert!(positive_segment("abc", "bad").is_err());
        assert!(positive_segment("0", "bad").is_err());
    }
}
