//! Locally imported catalog products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use dmarketplace_core::{Price, ProductId, SellerId};

/// A product a seller imported from Printful and priced themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub seller_id: SellerId,
    pub external_product_id: i64,
    pub name: String,
    pub thumbnail_url: Option<String>,
    pub variant_count: i32,
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Provider fields merged with the merchant's overrides.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub seller_id: SellerId,
    pub external_product_id: i64,
    pub name: String,
    pub thumbnail_url: Option<String>,
    pub variant_count: i32,
    pub description: String,
    pub price: Price,
    pub quantity: i32,
    pub category: String,
}

/// Product counts for one seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProductCounts {
    pub total: i64,
    /// Products with stock left.
    pub active: i64,
}
