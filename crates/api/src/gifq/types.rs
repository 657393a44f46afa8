//! GIFQ API payloads.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A brand and the gift card products it offers.
#[derive(Debug, Clone, Deserialize)]
pub struct GifqBrand {
    pub brand: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub products: Vec<GifqProduct>,
}

/// One purchasable product of a brand.
#[derive(Debug, Clone, Deserialize)]
pub struct GifqProduct {
    pub currency: String,
    pub min_face_value: Decimal,
    #[serde(default)]
    pub countries: Vec<String>,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateOrder {
    pub brand: String,
    pub currency: String,
    pub face_value: Decimal,
    pub country: String,
    pub reference: String,
}

/// GIFQ order ids come back as numbers or strings depending on the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum GifqOrderId {
    Number(i64),
    Text(String),
}

impl fmt::Display for GifqOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// An order as returned by the list and detail endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct GifqOrder {
    pub id: GifqOrderId,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub face_value: Option<Decimal>,
    #[serde(default)]
    pub redeem_details: Option<RedeemDetails>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Where an order stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Completed,
    Failed,
    InProgress,
}

impl GifqOrder {
    #[must_use]
    pub fn state(&self) -> OrderState {
        match self.status.to_ascii_lowercase().as_str() {
            "completed" | "complete" => OrderState::Completed,
            "failed" | "error" => OrderState::Failed,
            _ => OrderState::InProgress,
        }
    }
}

/// Redemption fields nested under `redeem_details`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedeemDetails {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub secret_code: Option<String>,
    #[serde(default)]
    pub security_code: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_id_accepts_number_or_string() {
        let a: GifqOrder =
            serde_json::from_value(serde_json::json!({ "id": 12, "status": "pending" })).unwrap();
        let b: GifqOrder =
            serde_json::from_value(serde_json::json!({ "id": "ord_12", "status": "complete" }))
                .unwrap();
        assert_eq!(a.id.to_string(), "12");
        assert_eq!(b.id.to_string(), "ord_12");
        assert_eq!(a.state(), OrderState::InProgress);
        assert_eq!(b.state(), OrderState::Completed);
    }

    #[test]
    fn test_failed_states() {
        for status in ["failed", "error", "FAILED"] {
            let order: GifqOrder =
                serde_json::from_value(serde_json::json!({ "id": 1, "status": status })).unwrap();
            assert_eq!(order.state(), OrderState::Failed);
        }
    }
}
