//! Order queries for `PgStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use dmarketplace_core::{Email, OrderId, OrderItemId, OrderStatus, StoreId, UserId};

use super::{OrderStore, PgStore, StoreError, map_write_error};
use crate::models::{NewOrderItem, Order, OrderItem, OrderStats};

const ORDER_ITEM_COLUMNS: &str = "id, order_id, store_id, product_id, variant_id, product_img, \
    product_name, product_price, quantity, total_amount, status, delivery_address, user_email, \
    city, zip_code, state, country, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    order_id: i32,
    store_id: i64,
    product_id: Option<String>,
    variant_id: Option<String>,
    product_img: String,
    product_name: String,
    product_price: Decimal,
    quantity: i32,
    total_amount: Decimal,
    status: OrderStatus,
    delivery_address: String,
    user_email: String,
    city: String,
    zip_code: String,
    state: String,
    country: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = StoreError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let user_email = Email::parse(&row.user_email).map_err(|e| {
            StoreError::DataCorruption(format!("invalid email on order item {}: {e}", row.id))
        })?;
        Ok(Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            store_id: StoreId::new(row.store_id),
            product_id: row.product_id,
            variant_id: row.variant_id,
            product_img: row.product_img,
            product_name: row.product_name,
            product_price: row.product_price,
            quantity: row.quantity,
            total_amount: row.total_amount,
            status: row.status,
            delivery_address: row.delivery_address,
            user_email,
            city: row.city,
            zip_code: row.zip_code,
            state: row.state,
            country: row.country,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_items(rows: Vec<OrderItemRow>) -> Result<Vec<OrderItem>, StoreError> {
    rows.into_iter().map(OrderItem::try_from).collect()
}

#[async_trait]
impl OrderStore for PgStore {
    async fn order_for_user(&self, user_id: UserId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, user_id, created_at FROM marketplace.customer_order WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| Order {
            id: OrderId::new(r.id),
            user_id: UserId::new(r.user_id),
            created_at: r.created_at,
        }))
    }

    async fn insert_order_item(
        &self,
        order_id: OrderId,
        item: &NewOrderItem,
    ) -> Result<OrderItem, StoreError> {
        let sql = format!(
            r"
            INSERT INTO marketplace.order_item (
                order_id, store_id, product_id, variant_id, product_img, product_name,
                product_price, quantity, total_amount, status, delivery_address, user_email,
                city, zip_code, state, country
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {ORDER_ITEM_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, OrderItemRow>(&sql)
            .bind(order_id)
            .bind(item.store_id)
            .bind(&item.product_id)
            .bind(&item.variant_id)
            .bind(&item.product_img)
            .bind(&item.product_name)
            .bind(item.product_price)
            .bind(item.quantity)
            .bind(item.total_amount)
            .bind(item.status)
            .bind(&item.delivery_address)
            .bind(item.user_email.as_str())
            .bind(&item.city)
            .bind(&item.zip_code)
            .bind(&item.state)
            .bind(&item.country)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;
        OrderItem::try_from(row)
    }

    async fn order_item_by_id(&self, id: OrderItemId) -> Result<Option<OrderItem>, StoreError> {
        let sql = format!("SELECT {ORDER_ITEM_COLUMNS} FROM marketplace.order_item WHERE id = $1");
        sqlx::query_as::<_, OrderItemRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(OrderItem::try_from)
            .transpose()
    }

    async fn compare_and_set_order_status(
        &self,
        id: OrderItemId,
        expected: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<OrderItem>, StoreError> {
        let sql = format!(
            r"
            UPDATE marketplace.order_item
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_ITEM_COLUMNS}
            "
        );
        sqlx::query_as::<_, OrderItemRow>(&sql)
            .bind(id)
            .bind(expected)
            .bind(to)
            .fetch_optional(&self.pool)
            .await?
            .map(OrderItem::try_from)
            .transpose()
    }

    async fn order_items_for_user(&self, user_id: UserId) -> Result<Vec<OrderItem>, StoreError> {
        let sql = format!(
            r"
            SELECT {ORDER_ITEM_COLUMNS}
            FROM marketplace.order_item
            WHERE order_id IN (SELECT id FROM marketplace.customer_order WHERE user_id = $1)
            ORDER BY created_at DESC, id DESC
            "
        );
        let rows = sqlx::query_as::<_, OrderItemRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        into_items(rows)
    }

    async fn order_items_for_store(
        &self,
        store_id: StoreId,
        limit: Option<i64>,
    ) -> Result<Vec<OrderItem>, StoreError> {
        // LIMIT NULL means no limit in Postgres.
        let sql = format!(
            r"
            SELECT {ORDER_ITEM_COLUMNS}
            FROM marketplace.order_item
            WHERE store_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "
        );
        let rows = sqlx::query_as::<_, OrderItemRow>(&sql)
            .bind(store_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        into_items(rows)
    }

    async fn order_stats_for_store(&self, store_id: StoreId) -> Result<OrderStats, StoreError> {
        let (total_orders, total_revenue) = sqlx::query_as::<_, (i64, Decimal)>(
            r"
            SELECT COUNT(*),
                   COALESCE(SUM(total_amount) FILTER (
                       WHERE status IN ('PAID', 'PROCESSING', 'SHIPPED', 'DELIVERED')
                   ), 0)
            FROM marketplace.order_item
            WHERE store_id = $1
            ",
        )
        .bind(store_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(OrderStats {
            total_orders,
            total_revenue,
        })
    }
}
