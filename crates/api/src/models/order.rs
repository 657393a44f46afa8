//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use dmarketplace_core::{Email, OrderId, OrderItemId, OrderStatus, StoreId, UserId};

/// A buyer's standing order container. Exactly one per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// One checkout line, placed against a seller's store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub store_id: StoreId,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub product_img: String,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i32,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub user_email: Email,
    pub city: String,
    pub zip_code: String,
    pub state: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated checkout line.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub store_id: StoreId,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub product_img: String,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i32,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub user_email: Email,
    pub city: String,
    pub zip_code: String,
    pub state: String,
    pub country: String,
}

/// Order aggregates for one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderStats {
    pub total_orders: i64,
    /// Sum of `total_amount` over revenue-counting statuses.
    pub total_revenue: Decimal,
}

/// Merchant dashboard headline numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: i64,
    pub active_products: i64,
    pub total_orders: i64,
    pub total_revenue: Decimal,
}
