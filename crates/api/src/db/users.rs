//! Buyer queries for `PgStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dmarketplace_core::{UserId, WalletAddress};

use super::{PgStore, StoreError, UserStore};
use crate::models::User;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    wallet_address: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let wallet_address = WalletAddress::parse(&row.wallet_address).map_err(|e| {
            StoreError::DataCorruption(format!("invalid wallet for user {}: {e}", row.id))
        })?;
        Ok(Self {
            id: UserId::new(row.id),
            wallet_address,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn upsert_user(&self, wallet: &WalletAddress) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO marketplace.app_user (wallet_address)
            VALUES ($1)
            ON CONFLICT (wallet_address) DO NOTHING
            RETURNING id, wallet_address, created_at
            ",
        )
        .bind(wallet.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let row = match inserted {
            Some(row) => {
                sqlx::query("INSERT INTO marketplace.cart (user_id) VALUES ($1)")
                    .bind(row.id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query("INSERT INTO marketplace.customer_order (user_id) VALUES ($1)")
                    .bind(row.id)
                    .execute(&mut *tx)
                    .await?;
                tracing::info!(user_id = row.id, "Created buyer with cart and order");
                row
            }
            None => {
                sqlx::query_as::<_, UserRow>(
                    r"
                    SELECT id, wallet_address, created_at
                    FROM marketplace.app_user
                    WHERE wallet_address = $1
                    ",
                )
                .bind(wallet.as_str())
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        User::try_from(row)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, wallet_address, created_at FROM marketplace.app_user WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, wallet_address, created_at
            FROM marketplace.app_user
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM marketplace.app_user")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
