//! GIFQ gift card provider.
//!
//! Every confirmed order earns the buyer the cheapest gift card available in
//! their country. Purchasing is asynchronous on GIFQ's side: after `POST
//! /orders` the order is found again by its reference and polled until it
//! completes or fails.
//!
//! In [`GifqMode::Mock`] a completed card is synthesized locally and no
//! request leaves the process.

#[cfg(test)]
pub(crate) mod fake;
pub mod types;

pub use types::{CreateOrder, GifqBrand, GifqOrder, GifqOrderId, GifqProduct, OrderState};

use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use dmarketplace_core::OrderItemId;

use crate::config::{GifqConfig, GifqMode};

/// Errors from the gift card flow.
#[derive(Debug, Error)]
pub enum GifqError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },

    /// No brand sells a card in the order's country.
    #[error("no gift card available for country {0}")]
    NoProductForCountry(String),

    /// GIFQ reported the order as failed.
    #[error("gift card order {reference} failed")]
    GiftCardFailed { reference: String },

    /// The order did not reach a terminal state within the polling budget.
    #[error("gift card order {reference} not completed after {attempts} attempts")]
    GiftCardTimeout { reference: String, attempts: u32 },

    /// Invalid configuration or response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// The card picked for an order, before purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GiftSelection {
    pub brand: String,
    pub title: String,
    pub currency: String,
    pub face_value: Decimal,
    pub country: String,
}

/// A purchased gift card and how to redeem it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftCard {
    pub brand: String,
    pub title: String,
    pub currency: String,
    pub face_value: Decimal,
    pub country: String,
    pub code: Option<String>,
    pub pin: Option<String>,
    pub link: Option<String>,
    pub secret_code: Option<String>,
    pub security_code: Option<String>,
    pub serial_number: Option<String>,
    pub instructions: Option<String>,
    pub expires_at: Option<String>,
    pub mock: bool,
}

impl GiftCard {
    fn from_order(selection: GiftSelection, order: GifqOrder) -> Self {
        let details = order.redeem_details.unwrap_or_default();
        Self {
            brand: selection.brand,
            title: selection.title,
            currency: order.currency.unwrap_or(selection.currency),
            face_value: order.face_value.unwrap_or(selection.face_value),
            country: selection.country,
            code: details.code.or(order.code),
            pin: details.pin.or(order.pin),
            link: details.link.or(order.link),
            secret_code: details.secret_code,
            security_code: details.security_code,
            serial_number: details.serial_number,
            instructions: order.instructions,
            expires_at: order.expires_at,
            mock: false,
        }
    }
}

/// Pick the cheapest card sold in `country`.
///
/// Each brand contributes its lowest `min_face_value` among products listed
/// for the country; the overall lowest wins. Ties keep the earlier brand.
#[must_use]
pub fn select_gift_product(brands: &[GifqBrand], country: &str) -> Option<GiftSelection> {
    brands
        .iter()
        .filter_map(|brand| {
            let cheapest = brand
                .products
                .iter()
                .filter(|p| p.countries.iter().any(|c| c.eq_ignore_ascii_case(country)))
                .min_by(|a, b| a.min_face_value.cmp(&b.min_face_value))?;
            Some(GiftSelection {
                brand: brand.brand.clone(),
                title: brand.title.clone().unwrap_or_else(|| brand.brand.clone()),
                currency: cheapest.currency.clone(),
                face_value: cheapest.min_face_value,
                country: country.to_string(),
            })
        })
        .min_by(|a, b| a.face_value.cmp(&b.face_value))
}

/// Reference GIFQ stores with the order, used to find it again.
#[must_use]
pub fn order_reference(order_item: OrderItemId, now_millis: i64) -> String {
    format!("order-{order_item}-gift-{now_millis}")
}

fn mock_code() -> String {
    let suffix: String = rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("MOCK-{}", suffix.to_ascii_uppercase())
}

/// GIFQ REST client.
#[derive(Clone)]
pub struct GifqClient {
    client: reqwest::Client,
    base: Url,
}

impl GifqClient {
    /// Create a new client authenticated with `X-Api-Token`.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(
        base: Url,
        api_key: &secrecy::SecretString,
        timeout: Duration,
    ) -> Result<Self, GifqError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Api-Token",
            HeaderValue::from_str(api_key.expose_secret())
                .map_err(|e| GifqError::Parse(format!("Invalid API key format: {e}")))?,
        );
        headers.insert("accept", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base })
    }

    fn url(&self, path: &str) -> Result<Url, GifqError> {
        self.base
            .join(path)
            .map_err(|e| GifqError::Parse(format!("invalid path {path}: {e}")))
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GifqError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GifqError::Api {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| GifqError::Parse(e.to_string()))
    }

    /// First page of the product catalog.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or GIFQ answers non-2xx.
    pub async fn list_products(&self) -> Result<Vec<GifqBrand>, GifqError> {
        let response = self.client.get(self.url("products?page=1")?).send().await?;
        Self::read(response).await
    }

    /// Place an order.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or GIFQ answers non-2xx.
    pub async fn create_order(&self, order: &CreateOrder) -> Result<(), GifqError> {
        let response = self
            .client
            .post(self.url("orders")?)
            .json(order)
            .send()
            .await?;
        let _: serde_json::Value = Self::read(response).await?;
        Ok(())
    }

    /// First page of recent orders.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or GIFQ answers non-2xx.
    pub async fn list_orders(&self) -> Result<Vec<GifqOrder>, GifqError> {
        let response = self.client.get(self.url("orders?page=1")?).send().await?;
        Self::read(response).await
    }

    /// Full order, including redemption details.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or GIFQ answers non-2xx.
    pub async fn order_details(&self, id: &GifqOrderId) -> Result<GifqOrder, GifqError> {
        let response = self
            .client
            .get(self.url(&format!("orders/{id}"))?)
            .send()
            .await?;
        Self::read(response).await
    }
}

/// Buys gift cards for confirmed orders.
#[derive(Clone)]
pub struct GiftCardIssuer {
    mode: GifqMode,
    client: GifqClient,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl GiftCardIssuer {
    /// Build an issuer, or `None` when no API key is configured.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn from_config(config: &GifqConfig) -> Result<Option<Self>, GifqError> {
        let Some(api_key) = &config.api_key else {
            return Ok(None);
        };
        let client = GifqClient::new(config.api_base.clone(), api_key, config.timeout)?;
        Ok(Some(Self {
            mode: config.mode,
            client,
            poll_attempts: config.poll_attempts.max(1),
            poll_interval: config.poll_interval,
        }))
    }

    /// Buy a card for one order item shipped to `country`.
    ///
    /// # Errors
    ///
    /// Returns `NoProductForCountry` when nothing is sold there,
    /// `GiftCardFailed` when GIFQ rejects the order and `GiftCardTimeout`
    /// when it is still pending after the polling budget.
    #[tracing::instrument(skip(self))]
    pub async fn issue(
        &self,
        order_item: OrderItemId,
        country: &str,
    ) -> Result<GiftCard, GifqError> {
        if self.mode == GifqMode::Mock {
            return Ok(Self::mock_card(country));
        }

        let brands = self.client.list_products().await?;
        let selection = select_gift_product(&brands, country)
            .ok_or_else(|| GifqError::NoProductForCountry(country.to_string()))?;

        let reference = order_reference(order_item, Utc::now().timestamp_millis());
        self.client
            .create_order(&CreateOrder {
                brand: selection.brand.clone(),
                currency: selection.currency.clone(),
                face_value: selection.face_value,
                country: selection.country.clone(),
                reference: reference.clone(),
            })
            .await?;

        let order = self.wait_for_completion(&reference).await?;
        Ok(GiftCard::from_order(selection, order))
    }

    async fn wait_for_completion(&self, reference: &str) -> Result<GifqOrder, GifqError> {
        for attempt in 1..=self.poll_attempts {
            match self.client.list_orders().await {
                Ok(orders) => {
                    let found = orders
                        .into_iter()
                        .find(|o| o.reference.as_deref() == Some(reference));
                    match found.as_ref().map(GifqOrder::state) {
                        Some(OrderState::Completed) => {
                            if let Some(order) = found {
                                return self.client.order_details(&order.id).await;
                            }
                        }
                        Some(OrderState::Failed) => {
                            return Err(GifqError::GiftCardFailed {
                                reference: reference.to_string(),
                            });
                        }
                        Some(OrderState::InProgress) | None => {}
                    }
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Gift card status poll failed");
                }
            }

            if attempt < self.poll_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Err(GifqError::GiftCardTimeout {
            reference: reference.to_string(),
            attempts: self.poll_attempts,
        })
    }

    fn mock_card(country: &str) -> GiftCard {
        GiftCard {
            brand: "mock".to_string(),
            title: "Mock Gift Card".to_string(),
            currency: "EUR".to_string(),
            face_value: Decimal::new(10, 0),
            country: country.to_string(),
            code: Some(mock_code()),
            pin: None,
            link: None,
            secret_code: None,
            security_code: None,
            serial_number: None,
            instructions: None,
            expires_at: None,
            mock: true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use secrecy::SecretString;

    use super::*;

    fn brand(name: &str, products: &[(&str, i64, &[&str])]) -> GifqBrand {
        GifqBrand {
            brand: name.to_string(),
            title: Some(format!("{name} card")),
            products: products
                .iter()
                .map(|(currency, value, countries)| GifqProduct {
                    currency: (*currency).to_string(),
                    min_face_value: Decimal::new(*value, 0),
                    countries: countries.iter().map(|c| (*c).to_string()).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_select_cheapest_card_for_country() {
        let brands = vec![
            brand("amazon", &[("EUR", 25, &["DE", "FR"]), ("EUR", 15, &["DE"])]),
            brand("zalando", &[("EUR", 10, &["FR"])]),
            brand("ikea", &[("EUR", 20, &["DE"])]),
        ];
        let pick = select_gift_product(&brands, "DE").unwrap();
        assert_eq!(pick.brand, "amazon");
        assert_eq!(pick.face_value, Decimal::new(15, 0));

        let pick = select_gift_product(&brands, "FR").unwrap();
        assert_eq!(pick.brand, "zalando");

        assert!(select_gift_product(&brands, "US").is_none());
    }

    #[test]
    fn test_order_reference_format() {
        assert_eq!(
            order_reference(OrderItemId::new(12), 1_700_000_000_000),
            "order-12-gift-1700000000000"
        );
    }

    #[test]
    fn test_mock_code_format() {
        let code = mock_code();
        assert!(code.starts_with("MOCK-"));
        assert_eq!(code.len(), 13);
        assert!(
            code[5..]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    async fn issuer(
        complete_after: u32,
        final_status: &'static str,
        attempts: u32,
    ) -> (GiftCardIssuer, Arc<AtomicU32>) {
        fake::issuer(complete_after, final_status, attempts, Duration::from_millis(5)).await
    }

    #[tokio::test]
    async fn test_issue_polls_until_completed() {
        let (issuer, polls) = issuer(3, "completed", 15).await;
        let card = issuer.issue(OrderItemId::new(5), "DE").await.unwrap();
        assert_eq!(card.brand, "amazon");
        assert_eq!(card.code.as_deref(), Some("AMZ-1234"));
        assert_eq!(card.pin.as_deref(), Some("9999"));
        assert!(!card.mock);
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_issue_reports_failure() {
        let (issuer, _) = issuer(1, "failed", 15).await;
        let err = issuer.issue(OrderItemId::new(5), "DE").await.unwrap_err();
        assert!(matches!(err, GifqError::GiftCardFailed { .. }));
    }

    #[tokio::test]
    async fn test_issue_times_out_after_budget() {
        let (issuer, polls) = issuer(100, "completed", 4).await;
        let err = issuer.issue(OrderItemId::new(5), "DE").await.unwrap_err();
        assert!(matches!(err, GifqError::GiftCardTimeout { attempts: 4, .. }));
        assert_eq!(polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_issue_without_product_for_country() {
        let (issuer, _) = issuer(1, "completed", 3).await;
        let err = issuer.issue(OrderItemId::new(5), "US").await.unwrap_err();
        assert!(matches!(err, GifqError::NoProductForCountry(_)));
    }

    #[tokio::test]
    async fn test_mock_mode_makes_no_requests() {
        let config = GifqConfig {
            api_key: Some(SecretString::from("gifq_test_token")),
            api_base: Url::parse("http://127.0.0.1:9/api/").unwrap(),
            mode: GifqMode::Mock,
            poll_attempts: 15,
            poll_interval: Duration::from_secs(3),
            timeout: Duration::from_secs(1),
        };
        let issuer = GiftCardIssuer::from_config(&config).unwrap().unwrap();
        let card = issuer.issue(OrderItemId::new(1), "DE").await.unwrap();
        assert!(card.mock);
        assert!(card.code.unwrap().starts_with("MOCK-"));
    }

    #[test]
    fn test_disabled_without_api_key() {
        let config = GifqConfig {
            api_key: None,
            api_base: Url::parse("https://api-sandbox.gifq.com/api/").unwrap(),
            mode: GifqMode::Live,
            poll_attempts: 15,
            poll_interval: Duration::from_secs(3),
            timeout: Duration::from_secs(1),
        };
        assert!(GiftCardIssuer::from_config(&config).unwrap().is_none());
    }
}
