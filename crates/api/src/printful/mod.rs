//! Printful API client.
//!
//! Merchants link a Printful store to their seller account; the storefront
//! then reads that store's synced products through this client using the
//! merchant's own API key. No retries are made: any non-2xx response is
//! surfaced as [`PrintfulError::Upstream`] with the provider's status.

pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use types::{PrintfulStore, ProductDetail, SyncProduct};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use dmarketplace_core::{ApiKey, StoreId};

use crate::config::PrintfulConfig;
use types::Envelope;

/// Header selecting which of the key's stores a request targets.
const STORE_HEADER: &str = "X-PF-Store-Id";

/// Errors that can occur when talking to Printful.
#[derive(Debug, Error)]
pub enum PrintfulError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Printful refused the key, or the key reaches no store.
    #[error("invalid Printful credential: {0}")]
    InvalidCredential(&'static str),

    /// Printful answered with a non-2xx status.
    #[error("Printful returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Printful REST client.
#[derive(Clone)]
pub struct PrintfulClient {
    client: reqwest::Client,
    base: Url,
}

impl PrintfulClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &PrintfulConfig) -> Result<Self, PrintfulError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base: config.api_base.clone(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, PrintfulError> {
        self.base
            .join(path)
            .map_err(|e| PrintfulError::Parse(format!("invalid path {path}: {e}")))
    }

    fn headers(api_key: &ApiKey, store_id: Option<StoreId>) -> Result<HeaderMap, PrintfulError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.expose()))
            .map_err(|_| PrintfulError::InvalidCredential("API key contains invalid characters"))?;
        headers.insert(AUTHORIZATION, auth);
        if let Some(store_id) = store_id {
            headers.insert(STORE_HEADER, HeaderValue::from(store_id.as_i64()));
        }
        Ok(headers)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        api_key: &ApiKey,
        store_id: Option<StoreId>,
    ) -> Result<T, PrintfulError> {
        let response = self
            .client
            .get(self.url(path)?)
            .headers(Self::headers(api_key, store_id)?)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PrintfulError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PrintfulError::Parse(e.to_string()))
    }

    /// List the stores an API key can reach.
    ///
    /// # Errors
    ///
    /// Returns `PrintfulError::InvalidCredential` when Printful rejects the
    /// key (any 4xx) or the key reaches no store, and
    /// `PrintfulError::Upstream` for provider-side failures.
    #[tracing::instrument(skip(self, api_key), fields(key = %api_key.hint()))]
    pub async fn list_stores(&self, api_key: &ApiKey) -> Result<Vec<PrintfulStore>, PrintfulError> {
        let envelope: Envelope<Vec<PrintfulStore>> = match self.get("stores", api_key, None).await {
            Ok(envelope) => envelope,
            Err(PrintfulError::Upstream { status, .. }) if (400..500).contains(&status) => {
                return Err(PrintfulError::InvalidCredential("Invalid Printful API Key"));
            }
            Err(e) => return Err(e),
        };

        if envelope.result.is_empty() {
            return Err(PrintfulError::InvalidCredential(
                "No stores found for this API key",
            ));
        }
        Ok(envelope.result)
    }

    /// Fetch every synced product of a store.
    ///
    /// Returned verbatim so the storefront sees Printful's own shape.
    ///
    /// # Errors
    ///
    /// Returns `PrintfulError::Upstream` with Printful's status on non-2xx.
    #[tracing::instrument(skip(self, api_key))]
    pub async fn store_products(
        &self,
        store_id: StoreId,
        api_key: &ApiKey,
    ) -> Result<Value, PrintfulError> {
        self.get("store/products", api_key, Some(store_id)).await
    }

    /// Fetch one synced product with its variants.
    ///
    /// # Errors
    ///
    /// Returns `PrintfulError::Upstream` with Printful's status on non-2xx.
    #[tracing::instrument(skip(self, api_key))]
    pub async fn product_detail(
        &self,
        store_id: StoreId,
        product_id: i64,
        api_key: &ApiKey,
    ) -> Result<ProductDetail, PrintfulError> {
        let envelope: Envelope<ProductDetail> = self
            .get(&format!("store/products/{product_id}"), api_key, Some(store_id))
            .await?;
        Ok(envelope.result)
    }
}
