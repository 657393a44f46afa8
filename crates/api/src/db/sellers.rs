//! Seller queries for `PgStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dmarketplace_core::{ApiKey, Email, KybStatus, SellerId, StoreId, WalletAddress};

use super::{PgStore, SellerStore, StoreError, map_write_error};
use crate::models::{NewSeller, Seller, SellerCount, SellerProfileUpdate, VerificationUpdate};

const SELLER_COLUMNS: &str = "id, shop_name, wallet_address, business_email, description, \
    contact_number, business_address, logo_img, kyb_documents, printful_store_id, \
    printful_api_key, kyb_status, is_approved, approved_at, rejection_reason, created_at, \
    updated_at";

#[derive(sqlx::FromRow)]
struct SellerRow {
    id: i32,
    shop_name: String,
    wallet_address: String,
    business_email: String,
    description: Option<String>,
    contact_number: Option<String>,
    business_address: Option<String>,
    logo_img: Option<String>,
    kyb_documents: Option<String>,
    printful_store_id: Option<i64>,
    printful_api_key: Option<String>,
    kyb_status: KybStatus,
    is_approved: bool,
    approved_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SellerRow> for Seller {
    type Error = StoreError;

    fn try_from(row: SellerRow) -> Result<Self, Self::Error> {
        let wallet_address = WalletAddress::parse(&row.wallet_address).map_err(|e| {
            StoreError::DataCorruption(format!("invalid wallet for seller {}: {e}", row.id))
        })?;
        let business_email = Email::parse(&row.business_email).map_err(|e| {
            StoreError::DataCorruption(format!("invalid email for seller {}: {e}", row.id))
        })?;
        let printful_api_key = row
            .printful_api_key
            .as_deref()
            .map(ApiKey::parse)
            .transpose()
            .map_err(|e| {
                StoreError::DataCorruption(format!("invalid API key for seller {}: {e}", row.id))
            })?;

        Ok(Self {
            id: SellerId::new(row.id),
            shop_name: row.shop_name,
            wallet_address,
            business_email,
            description: row.description,
            contact_number: row.contact_number,
            business_address: row.business_address,
            logo_img: row.logo_img,
            kyb_documents: row.kyb_documents,
            printful_store_id: row.printful_store_id.map(StoreId::new),
            printful_api_key,
            kyb_status: row.kyb_status,
            is_approved: row.is_approved,
            approved_at: row.approved_at,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_seller(row: Option<SellerRow>) -> Result<Option<Seller>, StoreError> {
    row.map(Seller::try_from).transpose()
}

#[async_trait]
impl SellerStore for PgStore {
    async fn insert_seller(&self, seller: &NewSeller) -> Result<Seller, StoreError> {
        let sql = format!(
            r"
            INSERT INTO marketplace.seller (
                shop_name, wallet_address, business_email, description, contact_number,
                business_address, logo_img, kyb_documents, printful_store_id,
                printful_api_key, kyb_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {SELLER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, SellerRow>(&sql)
            .bind(&seller.shop_name)
            .bind(seller.wallet_address.as_str())
            .bind(seller.business_email.as_str())
            .bind(&seller.description)
            .bind(&seller.contact_number)
            .bind(&seller.business_address)
            .bind(&seller.logo_img)
            .bind(&seller.kyb_documents)
            .bind(seller.printful_store_id.map(|id| id.as_i64()))
            .bind(seller.printful_api_key.as_ref().map(ApiKey::expose))
            .bind(seller.kyb_status)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;

        Seller::try_from(row)
    }

    async fn seller_by_id(&self, id: SellerId) -> Result<Option<Seller>, StoreError> {
        let sql = format!("SELECT {SELLER_COLUMNS} FROM marketplace.seller WHERE id = $1");
        let row = sqlx::query_as::<_, SellerRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        into_seller(row)
    }

    async fn seller_by_store(&self, store_id: StoreId) -> Result<Option<Seller>, StoreError> {
        let sql =
            format!("SELECT {SELLER_COLUMNS} FROM marketplace.seller WHERE printful_store_id = $1");
        let row = sqlx::query_as::<_, SellerRow>(&sql)
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await?;
        into_seller(row)
    }

    async fn list_sellers(&self, status: Option<KybStatus>) -> Result<Vec<Seller>, StoreError> {
        let sql = format!(
            r"
            SELECT {SELLER_COLUMNS}
            FROM marketplace.seller
            WHERE $1::marketplace.kyb_status IS NULL OR kyb_status = $1
            ORDER BY created_at DESC, id DESC
            "
        );
        let rows = sqlx::query_as::<_, SellerRow>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Seller::try_from).collect()
    }

    async fn apply_verification(
        &self,
        id: SellerId,
        expected: KybStatus,
        update: &VerificationUpdate,
    ) -> Result<Option<Seller>, StoreError> {
        let sql = format!(
            r"
            UPDATE marketplace.seller
            SET kyb_status = $3,
                is_approved = $4,
                approved_at = $5,
                rejection_reason = $6,
                updated_at = NOW()
            WHERE id = $1 AND kyb_status = $2
            RETURNING {SELLER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, SellerRow>(&sql)
            .bind(id)
            .bind(expected)
            .bind(update.status())
            .bind(update.is_approved())
            .bind(update.approved_at())
            .bind(update.rejection_reason())
            .fetch_optional(&self.pool)
            .await?;
        into_seller(row)
    }

    async fn update_seller_profile(
        &self,
        id: SellerId,
        update: &SellerProfileUpdate,
    ) -> Result<Option<Seller>, StoreError> {
        let sql = format!(
            r"
            UPDATE marketplace.seller
            SET shop_name = COALESCE($2, shop_name),
                business_email = COALESCE($3, business_email),
                contact_number = COALESCE($4, contact_number),
                description = COALESCE($5, description),
                business_address = COALESCE($6, business_address),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SELLER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, SellerRow>(&sql)
            .bind(id)
            .bind(&update.shop_name)
            .bind(update.business_email.as_ref().map(Email::as_str))
            .bind(&update.contact_number)
            .bind(&update.description)
            .bind(&update.business_address)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?;
        into_seller(row)
    }

    async fn set_printful_credentials(
        &self,
        id: SellerId,
        store_id: StoreId,
        api_key: &ApiKey,
    ) -> Result<Option<Seller>, StoreError> {
        let sql = format!(
            r"
            UPDATE marketplace.seller
            SET printful_store_id = $2, printful_api_key = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {SELLER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, SellerRow>(&sql)
            .bind(id)
            .bind(store_id)
            .bind(api_key.expose())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?;
        into_seller(row)
    }

    async fn count_sellers(&self, which: SellerCount) -> Result<i64, StoreError> {
        let count = match which {
            SellerCount::All => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM marketplace.seller")
                    .fetch_one(&self.pool)
                    .await?
            }
            SellerCount::WithStatus(status) => sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM marketplace.seller WHERE kyb_status = $1",
            )
            .bind(status)
            .fetch_one(&self.pool)
            .await?,
            SellerCount::Approved => sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM marketplace.seller WHERE kyb_status = 'APPROVED' AND is_approved",
            )
            .fetch_one(&self.pool)
            .await?,
        };
        Ok(count)
    }
}
