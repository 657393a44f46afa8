//! Printful catalog sync: credential checks, catalog proxying, product import.

use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;

use dmarketplace_core::{ApiKey, Price, ProductId, SellerId, StoreId, WalletAddress};

use crate::db::{MarketStore, ProductStore, SellerStore, StoreError};
use crate::models::{NewProduct, Product, Seller};
use crate::printful::{PrintfulClient, PrintfulError, PrintfulStore, ProductDetail};
use crate::services::auth::{AuthError, Principal};

/// Minimum length of a merchant-written product description.
pub const MIN_DESCRIPTION_LENGTH: usize = 50;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Printful(#[from] PrintfulError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Seller not found")]
    SellerNotFound,

    #[error("Store not found")]
    StoreNotFound,

    #[error("Store not found or API key not configured")]
    StoreNotConfigured,

    #[error("Product not found")]
    ProductNotFound,

    #[error("Store ID is not available for this API key")]
    StoreNotInCredential,

    #[error("{0}")]
    InvalidProduct(&'static str),
}

/// Fields Printful does not supply, written by the merchant on import.
#[derive(Debug, Clone)]
pub struct ProductOverrides {
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    pub category: String,
}

impl ProductOverrides {
    /// # Errors
    ///
    /// Returns `InvalidProduct` naming the first rule that fails.
    pub fn validate(&self) -> Result<Price, CatalogError> {
        if self.description.trim().chars().count() < MIN_DESCRIPTION_LENGTH {
            return Err(CatalogError::InvalidProduct(
                "Description must be at least 50 characters",
            ));
        }
        let price = Price::new(self.price)
            .map_err(|_| CatalogError::InvalidProduct("Price must be greater than 0"))?;
        if self.category.trim().is_empty() {
            return Err(CatalogError::InvalidProduct("Category is required"));
        }
        if self.quantity < 0 {
            return Err(CatalogError::InvalidProduct("Quantity cannot be negative"));
        }
        Ok(price)
    }
}

pub struct CatalogService<'a> {
    store: &'a dyn MarketStore,
    printful: &'a PrintfulClient,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn MarketStore, printful: &'a PrintfulClient) -> Self {
        Self { store, printful }
    }

    /// Stores reachable with `api_key`. Nothing is persisted.
    ///
    /// # Errors
    ///
    /// Returns `Printful(InvalidCredential)` when Printful rejects the key or
    /// the key reaches no store.
    pub async fn verify_credential(
        &self,
        api_key: &ApiKey,
    ) -> Result<Vec<PrintfulStore>, CatalogError> {
        Ok(self.printful.list_stores(api_key).await?)
    }

    /// Seller owning `store_id` together with its credential.
    async fn linked(&self, store_id: StoreId) -> Result<(Seller, ApiKey), CatalogError> {
        let seller = self
            .store
            .seller_by_store(store_id)
            .await?
            .ok_or(CatalogError::StoreNotConfigured)?;
        let key = seller
            .printful_api_key
            .clone()
            .ok_or(CatalogError::StoreNotConfigured)?;
        Ok((seller, key))
    }

    /// Printful's product list for a linked store, unmodified.
    ///
    /// # Errors
    ///
    /// Returns `StoreNotConfigured` or `Printful(Upstream)` with Printful's status.
    #[tracing::instrument(skip(self))]
    pub async fn store_catalog(&self, store_id: StoreId) -> Result<Value, CatalogError> {
        let (_, key) = self.linked(store_id).await?;
        Ok(self.printful.store_products(store_id, &key).await?)
    }

    /// # Errors
    ///
    /// Returns `StoreNotConfigured` or `Printful(Upstream)` with Printful's status.
    #[tracing::instrument(skip(self))]
    pub async fn product_detail(
        &self,
        store_id: StoreId,
        product_id: i64,
    ) -> Result<ProductDetail, CatalogError> {
        let (_, key) = self.linked(store_id).await?;
        Ok(self
            .printful
            .product_detail(store_id, product_id, &key)
            .await?)
    }

    /// Verify `api_key` and link it with `store_id` to the seller.
    ///
    /// # Errors
    ///
    /// Returns `Printful(InvalidCredential)`, `StoreNotInCredential` when the
    /// key cannot reach `store_id`, `SellerNotFound`, or
    /// `Store(Conflict(DuplicateStore))` when another seller holds the store.
    #[tracing::instrument(skip(self, api_key), fields(key = %api_key.hint()))]
    pub async fn connect_printful(
        &self,
        seller_id: SellerId,
        api_key: &ApiKey,
        store_id: StoreId,
    ) -> Result<Seller, CatalogError> {
        let stores = self.verify_credential(api_key).await?;
        if !stores.iter().any(|s| s.id == store_id.as_i64()) {
            return Err(CatalogError::StoreNotInCredential);
        }
        let seller = self
            .store
            .set_printful_credentials(seller_id, store_id, api_key)
            .await?
            .ok_or(CatalogError::SellerNotFound)?;
        tracing::info!(seller_id = %seller_id, store_id = %store_id, "Printful store linked");
        Ok(seller)
    }

    /// # Errors
    ///
    /// Returns `Store` if the query fails.
    pub async fn products_for_seller(
        &self,
        seller_id: SellerId,
    ) -> Result<Vec<Product>, CatalogError> {
        Ok(self.store.products_for_seller(seller_id).await?)
    }

    /// Copy a Printful product into the seller's catalog with their overrides.
    ///
    /// # Errors
    ///
    /// Returns `InvalidProduct` before any lookup, then `SellerNotFound`,
    /// `StoreNotConfigured`, `Printful(Upstream)`, or
    /// `Store(Conflict(DuplicateProduct))`.
    #[tracing::instrument(skip(self, overrides))]
    pub async fn import_product(
        &self,
        seller_id: SellerId,
        external_product_id: i64,
        overrides: &ProductOverrides,
    ) -> Result<Product, CatalogError> {
        let price = overrides.validate()?;

        let seller = self
            .store
            .seller_by_id(seller_id)
            .await?
            .ok_or(CatalogError::SellerNotFound)?;
        let (Some(store_id), Some(key)) = (seller.printful_store_id, &seller.printful_api_key)
        else {
            return Err(CatalogError::StoreNotConfigured);
        };

        let detail = self
            .printful
            .product_detail(store_id, external_product_id, key)
            .await?;
        let source = detail.sync_product;

        let product = self
            .store
            .insert_product(&NewProduct {
                seller_id,
                external_product_id: source.id,
                name: source.name,
                thumbnail_url: source.thumbnail_url,
                variant_count: source.variants,
                description: overrides.description.trim().to_string(),
                price,
                quantity: overrides.quantity,
                category: overrides.category.trim().to_string(),
            })
            .await?;
        tracing::info!(product_id = %product.id, "Product imported");
        Ok(product)
    }

    /// Delete a product the actor manages.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound` or `Auth(Forbidden)`.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(
        &self,
        product_id: ProductId,
        actor: &Principal,
    ) -> Result<(), CatalogError> {
        let product = self
            .store
            .product_by_id(product_id)
            .await?
            .ok_or(CatalogError::ProductNotFound)?;
        actor.ensure_can_manage(product.seller_id)?;

        if self.store.delete_product(product_id).await? {
            Ok(())
        } else {
            Err(CatalogError::ProductNotFound)
        }
    }

    /// The stored Printful key of a store, for its own merchant or an admin.
    ///
    /// # Errors
    ///
    /// Returns `StoreNotConfigured` or `Auth(Forbidden)`.
    pub async fn api_key_for_store(
        &self,
        store_id: StoreId,
        actor: &Principal,
    ) -> Result<ApiKey, CatalogError> {
        let (seller, key) = self.linked(store_id).await?;
        actor.ensure_can_manage(seller.id)?;
        tracing::info!(seller_id = %seller.id, "Printful API key disclosed");
        Ok(key)
    }

    /// # Errors
    ///
    /// Returns `StoreNotFound` when no seller holds `store_id`.
    pub async fn wallet_for_store(&self, store_id: StoreId) -> Result<WalletAddress, CatalogError> {
        self.store
            .seller_by_store(store_id)
            .await?
            .map(|s| s.wallet_address)
            .ok_or(CatalogError::StoreNotFound)
    }
}
