//! Imported product queries for `PgStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use dmarketplace_core::{ProductId, SellerId};

use super::{PgStore, ProductStore, StoreError, map_write_error};
use crate::models::{NewProduct, Product, ProductCounts};

const PRODUCT_COLUMNS: &str = "id, seller_id, external_product_id, name, thumbnail_url, \
    variant_count, description, price, quantity, category, created_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    seller_id: i32,
    external_product_id: i64,
    name: String,
    thumbnail_url: Option<String>,
    variant_count: i32,
    description: String,
    price: Decimal,
    quantity: i32,
    category: String,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            seller_id: SellerId::new(row.seller_id),
            external_product_id: row.external_product_id,
            name: row.name,
            thumbnail_url: row.thumbnail_url,
            variant_count: row.variant_count,
            description: row.description,
            price: row.price,
            quantity: row.quantity,
            category: row.category,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn insert_product(&self, product: &NewProduct) -> Result<Product, StoreError> {
        let sql = format!(
            r"
            INSERT INTO marketplace.product (
                seller_id, external_product_id, name, thumbnail_url, variant_count,
                description, price, quantity, category
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PRODUCT_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(product.seller_id)
            .bind(product.external_product_id)
            .bind(&product.name)
            .bind(&product.thumbnail_url)
            .bind(product.variant_count)
            .bind(&product.description)
            .bind(product.price.amount())
            .bind(product.quantity)
            .bind(&product.category)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(Product::from(row))
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM marketplace.product WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Product::from))
    }

    async fn products_for_seller(
        &self,
        seller_id: SellerId,
    ) -> Result<Vec<Product>, StoreError> {
        let sql = format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM marketplace.product
            WHERE seller_id = $1
            ORDER BY created_at DESC, id DESC
            "
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(seller_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM marketplace.product WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn product_counts(&self, seller_id: SellerId) -> Result<ProductCounts, StoreError> {
        let (total, active) = sqlx::query_as::<_, (i64, i64)>(
            r"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE quantity > 0)
            FROM marketplace.product
            WHERE seller_id = $1
            ",
        )
        .bind(seller_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(ProductCounts { total, active })
    }
}
