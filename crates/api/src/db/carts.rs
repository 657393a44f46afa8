//! Cart queries for `PgStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use dmarketplace_core::{CartId, CartItemId, StoreId, UserId};

use super::{CartStore, ConflictKind, PgStore, StoreError, map_write_error};
use crate::models::{Cart, CartItem, MAX_CART_QUANTITY, NewCartItem};

const CART_ITEM_COLUMNS: &str = "id, cart_id, store_id, product_id, variant_id, product_img, \
    product_name, product_price, quantity, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CartRow {
    id: i32,
    user_id: i32,
    created_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartId::new(row.id),
            user_id: UserId::new(row.user_id),
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: i32,
    cart_id: i32,
    store_id: i64,
    product_id: String,
    variant_id: String,
    product_img: String,
    product_name: String,
    product_price: Decimal,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            id: CartItemId::new(row.id),
            cart_id: CartId::new(row.cart_id),
            store_id: StoreId::new(row.store_id),
            product_id: row.product_id,
            variant_id: row.variant_id,
            product_img: row.product_img,
            product_name: row.product_name,
            product_price: row.product_price,
            quantity: row.quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id, created_at FROM marketplace.cart WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Cart::from))
    }

    async fn cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, StoreError> {
        let sql = format!(
            "SELECT {CART_ITEM_COLUMNS} FROM marketplace.cart_item WHERE cart_id = $1 ORDER BY id"
        );
        let rows = sqlx::query_as::<_, CartItemRow>(&sql)
            .bind(cart_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(CartItem::from).collect())
    }

    async fn add_cart_item(
        &self,
        cart_id: CartId,
        item: &NewCartItem,
    ) -> Result<CartItem, StoreError> {
        // Snapshot fields keep the values from the first add. A sum past the
        // cap leaves the row untouched and returns nothing.
        let sql = format!(
            r"
            INSERT INTO marketplace.cart_item AS ci (
                cart_id, store_id, product_id, variant_id, product_img, product_name,
                product_price, quantity
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (cart_id, variant_id) DO UPDATE
            SET quantity = ci.quantity + EXCLUDED.quantity,
                updated_at = NOW()
            WHERE ci.quantity::BIGINT + EXCLUDED.quantity <= $9
            RETURNING {CART_ITEM_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, CartItemRow>(&sql)
            .bind(cart_id)
            .bind(item.store_id)
            .bind(&item.product_id)
            .bind(&item.variant_id)
            .bind(&item.product_img)
            .bind(&item.product_name)
            .bind(item.product_price.amount())
            .bind(item.quantity)
            .bind(i64::from(MAX_CART_QUANTITY))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?;
        row.map(CartItem::from)
            .ok_or(StoreError::Conflict(ConflictKind::QuantityLimit))
    }

    async fn cart_item_by_id(&self, id: CartItemId) -> Result<Option<CartItem>, StoreError> {
        let sql = format!("SELECT {CART_ITEM_COLUMNS} FROM marketplace.cart_item WHERE id = $1");
        let row = sqlx::query_as::<_, CartItemRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(CartItem::from))
    }

    async fn delete_cart_item(&self, id: CartItemId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM marketplace.cart_item WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_cart_item_quantity(
        &self,
        id: CartItemId,
        quantity: i32,
    ) -> Result<Option<CartItem>, StoreError> {
        let sql = format!(
            r"
            UPDATE marketplace.cart_item
            SET quantity = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {CART_ITEM_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, CartItemRow>(&sql)
            .bind(id)
            .bind(quantity)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(CartItem::from))
    }
}
