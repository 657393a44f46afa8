//! Merchant onboarding and KYB verification.

use chrono::Utc;
use thiserror::Error;

use dmarketplace_core::{
    IllegalTransition, KybStatus, SellerId, StatusMachine, TransitionOutcome,
    VerificationDecision,
};

use crate::db::{ConflictKind, MarketStore, SellerStore, StoreError, UserStore};
use crate::models::{
    NewSeller, PlatformMetrics, Seller, SellerCount, SellerProfileUpdate, SellerSummary,
    VerificationUpdate,
};
use crate::services::notifications::{ApprovalPhase, Notification, NotificationDispatcher};

/// Errors from the verification workflow.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Seller not found")]
    SellerNotFound,

    #[error("Invalid verification change: {0}")]
    IllegalTransition(#[from] IllegalTransition<KybStatus>),
}

/// Seller lifecycle: application, review, decision, profile edits.
pub struct VerificationService<'a> {
    store: &'a dyn MarketStore,
    notifier: Option<&'a NotificationDispatcher>,
}

impl<'a> VerificationService<'a> {
    /// Service that emails merchants about their application.
    #[must_use]
    pub const fn new(store: &'a dyn MarketStore, notifier: &'a NotificationDispatcher) -> Self {
        Self {
            store,
            notifier: Some(notifier),
        }
    }

    /// Service with no email side effects (operator tooling).
    #[must_use]
    pub const fn silent(store: &'a dyn MarketStore) -> Self {
        Self {
            store,
            notifier: None,
        }
    }

    fn notify(&self, seller: &Seller, phase: ApprovalPhase) {
        if let Some(notifier) = self.notifier {
            notifier.notify(Notification::StoreApproval {
                seller_id: seller.id,
                shop_name: seller.shop_name.clone(),
                recipient: seller.business_email.clone(),
                phase,
            });
        }
    }

    /// Register a store application.
    ///
    /// # Errors
    ///
    /// Returns `Store(Conflict(DuplicateWallet | DuplicateEmail | DuplicateStore))`
    /// when a unique field is taken; nothing is written in that case.
    #[tracing::instrument(skip(self, application), fields(shop = %application.shop_name))]
    pub async fn submit(&self, application: &NewSeller) -> Result<Seller, VerificationError> {
        let seller = self.store.insert_seller(application).await?;
        tracing::info!(seller_id = %seller.id, status = %seller.kyb_status, "Store application submitted");
        self.notify(&seller, ApprovalPhase::Submitted);
        Ok(seller)
    }

    /// Pending applications, newest first, without wallets or credentials.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the query fails.
    pub async fn list_pending(&self) -> Result<Vec<SellerSummary>, VerificationError> {
        let sellers = self.store.list_sellers(Some(KybStatus::Pending)).await?;
        Ok(sellers.into_iter().map(SellerSummary::from).collect())
    }

    /// Sellers newest first, optionally by status.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the query fails.
    pub async fn list(&self, status: Option<KybStatus>) -> Result<Vec<Seller>, VerificationError> {
        Ok(self.store.list_sellers(status).await?)
    }

    /// Sellers visible on the storefront.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the query fails.
    pub async fn list_approved(&self) -> Result<Vec<Seller>, VerificationError> {
        let sellers = self.store.list_sellers(Some(KybStatus::Approved)).await?;
        Ok(sellers.into_iter().filter(|s| s.is_approved).collect())
    }

    /// # Errors
    ///
    /// Returns `SellerNotFound` when no seller has this id.
    pub async fn seller(&self, id: SellerId) -> Result<Seller, VerificationError> {
        self.store
            .seller_by_id(id)
            .await?
            .ok_or(VerificationError::SellerNotFound)
    }

    /// Record an admin decision.
    ///
    /// Re-applying the current status returns the seller untouched, except
    /// that rejecting again with a different reason stores and emails the new
    /// reason. Leaving `APPROVED` or `REJECTED` requires `force`.
    ///
    /// # Errors
    ///
    /// Returns `SellerNotFound`, `IllegalTransition`, or
    /// `Store(Conflict(StaleWrite))` when the status changed concurrently.
    #[tracing::instrument(skip(self))]
    pub async fn update_verification(
        &self,
        id: SellerId,
        decision: VerificationDecision,
        force: bool,
    ) -> Result<Seller, VerificationError> {
        let seller = self.seller(id).await?;
        let target = decision.target_status();

        match seller.kyb_status.check_transition(target, force)? {
            TransitionOutcome::Unchanged if !Self::changes_reason(&seller, &decision) => {
                return Ok(seller);
            }
            TransitionOutcome::Unchanged => {
                tracing::info!(seller_id = %id, "Replacing rejection reason");
            }
            TransitionOutcome::Forced => {
                tracing::warn!(seller_id = %id, from = %seller.kyb_status, to = %target, "Forcing verification status");
            }
            TransitionOutcome::Applied => {}
        }

        let update = VerificationUpdate::from_decision(&decision, Utc::now());
        let updated = self.apply(id, seller.kyb_status, &update).await?;

        tracing::info!(seller_id = %id, status = %updated.kyb_status, "Verification updated");
        let phase = match decision {
            VerificationDecision::Approve => ApprovalPhase::Approved,
            VerificationDecision::Reject { reason } => ApprovalPhase::Rejected { reason },
        };
        self.notify(&updated, phase);
        Ok(updated)
    }

    fn changes_reason(seller: &Seller, decision: &VerificationDecision) -> bool {
        match decision {
            VerificationDecision::Reject { reason } => {
                seller.rejection_reason.as_deref() != Some(reason.as_str())
            }
            VerificationDecision::Approve => false,
        }
    }

    /// Move a pending application into review.
    ///
    /// # Errors
    ///
    /// Returns `SellerNotFound`, or `IllegalTransition` unless the seller is
    /// `PENDING` or already `UNDER_REVIEW`.
    #[tracing::instrument(skip(self))]
    pub async fn mark_under_review(&self, id: SellerId) -> Result<Seller, VerificationError> {
        let seller = self.seller(id).await?;
        match seller
            .kyb_status
            .check_transition(KybStatus::UnderReview, false)?
        {
            TransitionOutcome::Unchanged => Ok(seller),
            TransitionOutcome::Applied | TransitionOutcome::Forced => {
                self.apply(id, seller.kyb_status, &VerificationUpdate::under_review())
                    .await
            }
        }
    }

    async fn apply(
        &self,
        id: SellerId,
        expected: KybStatus,
        update: &VerificationUpdate,
    ) -> Result<Seller, VerificationError> {
        if let Some(seller) = self.store.apply_verification(id, expected, update).await? {
            return Ok(seller);
        }
        match self.store.seller_by_id(id).await? {
            None => Err(VerificationError::SellerNotFound),
            Some(_) => Err(StoreError::Conflict(ConflictKind::StaleWrite).into()),
        }
    }

    /// Apply a merchant's own profile edits.
    ///
    /// # Errors
    ///
    /// Returns `SellerNotFound`, or `Store(Conflict(DuplicateEmail))` when the
    /// new business email belongs to another seller.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        id: SellerId,
        update: &SellerProfileUpdate,
    ) -> Result<Seller, VerificationError> {
        if update.is_empty() {
            return self.seller(id).await;
        }
        self.store
            .update_seller_profile(id, update)
            .await?
            .ok_or(VerificationError::SellerNotFound)
    }

    /// Headline counts for the admin dashboard, queried concurrently.
    ///
    /// # Errors
    ///
    /// Returns `Store` if any count fails.
    pub async fn dashboard_metrics(&self) -> Result<PlatformMetrics, VerificationError> {
        let (total_users, total_sellers, pending_sellers, approved_sellers) = tokio::try_join!(
            self.store.count_users(),
            self.store.count_sellers(SellerCount::All),
            self.store
                .count_sellers(SellerCount::WithStatus(KybStatus::Pending)),
            self.store.count_sellers(SellerCount::Approved),
        )?;
        Ok(PlatformMetrics {
            total_users,
            total_sellers,
            pending_sellers,
            approved_sellers,
        })
    }
}
