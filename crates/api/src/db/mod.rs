//! Persistence gateway for marketplace data.
//!
//! # Schema: `marketplace`
//!
//! - `seller` - Merchant storefronts and their KYB verification state
//! - `app_user` - Buyers, keyed by wallet address
//! - `cart` / `cart_item` - One cart per buyer, one line per (cart, variant)
//! - `customer_order` / `order_item` - One order container per buyer, one line per checkout
//! - `product` - Printful products imported by sellers
//!
//! # Implementations
//!
//! Business services talk to the [`MarketStore`] trait. [`PgStore`] is the
//! production implementation; [`MemoryStore`] keeps everything in-process for
//! tests and for running the service without a database.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p dmarketplace-cli -- migrate
//! ```

mod carts;
pub mod memory;
mod orders;
mod products;
mod sellers;
mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use dmarketplace_core::{
    ApiKey, CartId, CartItemId, KybStatus, OrderId, OrderItemId, OrderStatus, ProductId,
    SellerId, StoreId, UserId, WalletAddress,
};

use crate::models::{
    Cart, CartItem, NewCartItem, NewOrderItem, NewProduct, NewSeller, Order, OrderItem,
    OrderStats, Product, ProductCounts, Seller, SellerCount, SellerProfileUpdate, User,
    VerificationUpdate,
};

pub use memory::MemoryStore;

/// Which uniqueness rule a write violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    DuplicateWallet,
    DuplicateEmail,
    DuplicateStore,
    DuplicateCartItem,
    DuplicateProduct,
    /// Accumulating would push a cart line past its quantity cap.
    QuantityLimit,
    /// A conditional write lost against a concurrent one.
    StaleWrite,
    Other,
}

impl ConflictKind {
    /// Map a Postgres constraint name to the rule it enforces.
    #[must_use]
    pub fn from_constraint(name: Option<&str>) -> Self {
        match name {
            Some("seller_wallet_address_key") => Self::DuplicateWallet,
            Some("seller_business_email_key") => Self::DuplicateEmail,
            Some("seller_printful_store_id_key") => Self::DuplicateStore,
            Some("cart_item_cart_variant_key") => Self::DuplicateCartItem,
            Some("product_seller_external_key") => Self::DuplicateProduct,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::DuplicateWallet => "A store with this wallet address already exists",
            Self::DuplicateEmail => "A store with this business email already exists",
            Self::DuplicateStore => "This Printful store is already linked to another seller",
            Self::DuplicateCartItem => "This item is already in your cart",
            Self::DuplicateProduct => "This product has already been imported",
            Self::QuantityLimit => "Cart quantity limit reached for this item",
            Self::StaleWrite => "The record was changed by another request, please retry",
            Self::Other => "The record conflicts with an existing one",
        };
        f.write_str(text)
    }
}

/// Errors from the persistence gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., duplicate wallet address).
    #[error("constraint violation: {0}")]
    Conflict(ConflictKind),
}

/// Convert a failed write into a `Conflict` when it hit a unique constraint.
pub(crate) fn map_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return StoreError::Conflict(ConflictKind::from_constraint(db_err.constraint()));
    }
    StoreError::Database(e)
}

/// Seller persistence.
#[async_trait]
pub trait SellerStore: Send + Sync {
    /// Insert a new seller.
    ///
    /// Fails with `Conflict(DuplicateWallet | DuplicateEmail | DuplicateStore)`
    /// without writing anything when a unique field is taken.
    async fn insert_seller(&self, seller: &NewSeller) -> Result<Seller, StoreError>;

    async fn seller_by_id(&self, id: SellerId) -> Result<Option<Seller>, StoreError>;

    async fn seller_by_store(&self, store_id: StoreId) -> Result<Option<Seller>, StoreError>;

    /// Sellers newest first, optionally filtered by status.
    async fn list_sellers(&self, status: Option<KybStatus>) -> Result<Vec<Seller>, StoreError>;

    /// Write verification columns if the seller is still in `expected` status.
    ///
    /// Returns `None` when no row matched (missing seller or status changed).
    async fn apply_verification(
        &self,
        id: SellerId,
        expected: KybStatus,
        update: &VerificationUpdate,
    ) -> Result<Option<Seller>, StoreError>;

    async fn update_seller_profile(
        &self,
        id: SellerId,
        update: &SellerProfileUpdate,
    ) -> Result<Option<Seller>, StoreError>;

    async fn set_printful_credentials(
        &self,
        id: SellerId,
        store_id: StoreId,
        api_key: &ApiKey,
    ) -> Result<Option<Seller>, StoreError>;

    async fn count_sellers(&self, which: SellerCount) -> Result<i64, StoreError>;
}

/// Buyer persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Return the user for `wallet`, creating the user, cart and order
    /// container together on first contact.
    async fn upsert_user(&self, wallet: &WalletAddress) -> Result<User, StoreError>;

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Users newest first.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn count_users(&self) -> Result<i64, StoreError>;
}

/// Cart persistence.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>, StoreError>;

    /// Items of a cart, oldest first.
    async fn cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, StoreError>;

    /// Insert the item, or add its quantity to the existing line for the same
    /// variant, as one atomic write.
    async fn add_cart_item(
        &self,
        cart_id: CartId,
        item: &NewCartItem,
    ) -> Result<CartItem, StoreError>;

    async fn cart_item_by_id(&self, id: CartItemId) -> Result<Option<CartItem>, StoreError>;

    /// Returns `false` when no such item existed.
    async fn delete_cart_item(&self, id: CartItemId) -> Result<bool, StoreError>;

    async fn set_cart_item_quantity(
        &self,
        id: CartItemId,
        quantity: i32,
    ) -> Result<Option<CartItem>, StoreError>;
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn order_for_user(&self, user_id: UserId) -> Result<Option<Order>, StoreError>;

    async fn insert_order_item(
        &self,
        order_id: OrderId,
        item: &NewOrderItem,
    ) -> Result<OrderItem, StoreError>;

    async fn order_item_by_id(&self, id: OrderItemId) -> Result<Option<OrderItem>, StoreError>;

    /// Write `to` if the item is still in `expected` status.
    ///
    /// Returns `None` when no row matched (missing item or status changed).
    async fn compare_and_set_order_status(
        &self,
        id: OrderItemId,
        expected: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<OrderItem>, StoreError>;

    /// Items in a user's order container, newest first.
    async fn order_items_for_user(&self, user_id: UserId) -> Result<Vec<OrderItem>, StoreError>;

    /// Items placed against a store, newest first.
    async fn order_items_for_store(
        &self,
        store_id: StoreId,
        limit: Option<i64>,
    ) -> Result<Vec<OrderItem>, StoreError>;

    async fn order_stats_for_store(&self, store_id: StoreId) -> Result<OrderStats, StoreError>;
}

/// Imported product persistence.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert_product(&self, product: &NewProduct) -> Result<Product, StoreError>;

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// A seller's products, newest first.
    async fn products_for_seller(&self, seller_id: SellerId)
    -> Result<Vec<Product>, StoreError>;

    /// Returns `false` when no such product existed.
    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError>;

    async fn product_counts(&self, seller_id: SellerId) -> Result<ProductCounts, StoreError>;
}

/// The full persistence gateway used by the service.
#[async_trait]
pub trait MarketStore: SellerStore + UserStore + CartStore + OrderStore + ProductStore {
    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// `PostgreSQL` implementation of the persistence gateway.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MarketStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Embedded migrations from `crates/api/migrations`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_from_constraint() {
        assert_eq!(
            ConflictKind::from_constraint(Some("seller_wallet_address_key")),
            ConflictKind::DuplicateWallet
        );
        assert_eq!(
            ConflictKind::from_constraint(Some("seller_business_email_key")),
            ConflictKind::DuplicateEmail
        );
        assert_eq!(
            ConflictKind::from_constraint(Some("cart_item_cart_variant_key")),
            ConflictKind::DuplicateCartItem
        );
        assert_eq!(ConflictKind::from_constraint(None), ConflictKind::Other);
    }

    #[test]
    fn test_conflict_messages() {
        assert_eq!(
            ConflictKind::DuplicateCartItem.to_string(),
            "This item is already in your cart"
        );
        let err = StoreError::Conflict(ConflictKind::DuplicateWallet);
        assert!(err.to_string().contains("wallet address"));
    }
}
