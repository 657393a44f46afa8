//! Buyer and cart domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use dmarketplace_core::{CartId, CartItemId, Price, StoreId, UserId, WalletAddress};

/// A buyer, keyed by wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub wallet_address: WalletAddress,
    pub created_at: DateTime<Utc>,
}

/// A buyer's cart. Exactly one per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// A line in a cart.
///
/// Product name, image and price are snapshots taken when the item was first
/// added; they do not follow later catalog changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub store_id: StoreId,
    pub product_id: String,
    pub variant_id: String,
    pub product_img: String,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Largest quantity a single cart line may hold.
pub const MAX_CART_QUANTITY: i32 = 10_000;

/// A validated add-to-cart request.
#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub store_id: StoreId,
    pub product_id: String,
    pub variant_id: String,
    pub product_img: String,
    pub product_name: String,
    pub product_price: Price,
    pub quantity: i32,
}

/// A cart together with its items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDetails {
    #[serde(flatten)]
    pub cart: Cart,
    pub cart_items: Vec<CartItem>,
}
