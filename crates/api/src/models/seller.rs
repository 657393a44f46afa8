//! Seller (merchant) domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use dmarketplace_core::{
    ApiKey, Email, KybStatus, SellerId, StoreId, VerificationDecision, WalletAddress,
};

/// A merchant storefront.
///
/// The Printful credential is never serialized; it only leaves the process in
/// the `Authorization` header of a Printful request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    pub id: SellerId,
    pub shop_name: String,
    pub wallet_address: WalletAddress,
    pub business_email: Email,
    pub description: Option<String>,
    pub contact_number: Option<String>,
    pub business_address: Option<String>,
    pub logo_img: Option<String>,
    pub kyb_documents: Option<String>,
    #[serde(rename = "storeId")]
    pub printful_store_id: Option<StoreId>,
    #[serde(skip)]
    pub printful_api_key: Option<ApiKey>,
    pub kyb_status: KybStatus,
    pub is_approved: bool,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Seller {
    /// Whether the Printful credential and store are both linked.
    #[must_use]
    pub const fn has_printful(&self) -> bool {
        self.printful_store_id.is_some() && self.printful_api_key.is_some()
    }
}

/// Projection used by the admin review queue.
///
/// Omits the wallet address and credentials.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerSummary {
    pub id: SellerId,
    pub shop_name: String,
    pub business_email: Email,
    pub contact_number: Option<String>,
    pub business_address: Option<String>,
    pub description: Option<String>,
    pub logo_img: Option<String>,
    pub kyb_documents: Option<String>,
    pub kyb_status: KybStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Seller> for SellerSummary {
    fn from(seller: Seller) -> Self {
        Self {
            id: seller.id,
            shop_name: seller.shop_name,
            business_email: seller.business_email,
            contact_number: seller.contact_number,
            business_address: seller.business_address,
            description: seller.description,
            logo_img: seller.logo_img,
            kyb_documents: seller.kyb_documents,
            kyb_status: seller.kyb_status,
            created_at: seller.created_at,
        }
    }
}

/// A validated store application.
#[derive(Debug, Clone)]
pub struct NewSeller {
    pub shop_name: String,
    pub wallet_address: WalletAddress,
    pub business_email: Email,
    pub description: Option<String>,
    pub contact_number: Option<String>,
    pub business_address: Option<String>,
    pub logo_img: Option<String>,
    pub kyb_documents: Option<String>,
    pub printful_store_id: Option<StoreId>,
    pub printful_api_key: Option<ApiKey>,
    pub kyb_status: KybStatus,
}

/// Profile fields a merchant may change on their own store.
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct SellerProfileUpdate {
    pub shop_name: Option<String>,
    pub business_email: Option<Email>,
    pub contact_number: Option<String>,
    pub description: Option<String>,
    pub business_address: Option<String>,
}

impl SellerProfileUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.shop_name.is_none()
            && self.business_email.is_none()
            && self.contact_number.is_none()
            && self.description.is_none()
            && self.business_address.is_none()
    }
}

/// The verification columns of a seller, written together.
///
/// Only constructible from a status so that `is_approved` always mirrors
/// `APPROVED` and a rejection reason only exists on `REJECTED` rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationUpdate {
    status: KybStatus,
    approved_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
}

impl VerificationUpdate {
    /// Columns for an admin decision taken at `now`.
    #[must_use]
    pub fn from_decision(decision: &VerificationDecision, now: DateTime<Utc>) -> Self {
        match decision {
            VerificationDecision::Approve => Self {
                status: KybStatus::Approved,
                approved_at: Some(now),
                rejection_reason: None,
            },
            VerificationDecision::Reject { reason } => Self {
                status: KybStatus::Rejected,
                approved_at: None,
                rejection_reason: Some(reason.clone()),
            },
        }
    }

    /// Columns for moving an application into review.
    #[must_use]
    pub const fn under_review() -> Self {
        Self {
            status: KybStatus::UnderReview,
            approved_at: None,
            rejection_reason: None,
        }
    }

    #[must_use]
    pub const fn status(&self) -> KybStatus {
        self.status
    }

    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self.status, KybStatus::Approved)
    }

    #[must_use]
    pub const fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    #[must_use]
    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }
}

/// Which sellers to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellerCount {
    All,
    WithStatus(KybStatus),
    /// `APPROVED` and flagged approved.
    Approved,
}

/// Platform-wide counts for the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformMetrics {
    pub total_users: i64,
    pub total_sellers: i64,
    pub pending_sellers: i64,
    pub approved_sellers: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_clears_reason_and_sets_timestamp() {
        let now = Utc::now();
        let update = VerificationUpdate::from_decision(&VerificationDecision::Approve, now);
        assert_eq!(update.status(), KybStatus::Approved);
        assert!(update.is_approved());
        assert_eq!(update.approved_at(), Some(now));
        assert_eq!(update.rejection_reason(), None);
    }

    #[test]
    fn test_rejection_keeps_reason_and_clears_timestamp() {
        let decision = VerificationDecision::Reject {
            reason: "documents unreadable".to_string(),
        };
        let update = VerificationUpdate::from_decision(&decision, Utc::now());
        assert_eq!(update.status(), KybStatus::Rejected);
        assert!(!update.is_approved());
        assert_eq!(update.approved_at(), None);
        assert_eq!(update.rejection_reason(), Some("documents unreadable"));
    }

    #[test]
    fn test_under_review_is_not_approved() {
        let update = VerificationUpdate::under_review();
        assert!(!update.is_approved());
        assert_eq!(update.rejection_reason(), None);
    }

    #[test]
    fn test_seller_json_hides_api_key() {
        let seller = Seller {
            id: SellerId::new(1),
            shop_name: "Acme".to_string(),
            wallet_address: WalletAddress::parse("0x1").unwrap(),
            business_email: Email::parse("a@acme.com").unwrap(),
            description: None,
            contact_number: None,
            business_address: None,
            logo_img: None,
            kyb_documents: None,
            printful_store_id: Some(StoreId::new(99)),
            printful_api_key: Some(ApiKey::parse("pf_secret_token").unwrap()),
            kyb_status: KybStatus::Pending,
            is_approved: false,
            approved_at: None,
            rejection_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&seller).unwrap();
        assert_eq!(json["shopName"], "Acme");
        assert_eq!(json["storeId"], 99);
        assert_eq!(json["kybStatus"], "PENDING");
        assert!(!json.to_string().contains("pf_secret_token"));
        assert!(seller.has_printful());
    }

    #[test]
    fn test_profile_update_is_empty() {
        assert!(SellerProfileUpdate::default().is_empty());
        let update = SellerProfileUpdate {
            shop_name: Some("New".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
