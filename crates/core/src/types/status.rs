//! Status enums and their transition tables.
//!
//! Both seller verification (KYB) and order items move through a fixed set of
//! states. The allowed edges live here so the HTTP layer, the CLI and the
//! stores all agree on them.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Result of checking a status change against a transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The target equals the current status; nothing to write.
    Unchanged,
    /// The edge is in the table.
    Applied,
    /// The edge is not in the table but the caller asked to override it.
    Forced,
}

/// A status change that the transition table does not allow.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot move from {from} to {to}")]
pub struct IllegalTransition<S> {
    pub from: S,
    pub to: S,
}

/// A status field governed by a directed transition graph.
pub trait StatusMachine: Copy + Eq + fmt::Display + 'static {
    /// Statuses reachable from `self` in one step.
    fn allowed_next(self) -> &'static [Self];

    /// Whether no further transition is allowed without an override.
    fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Check a change from `self` to `to`.
    ///
    /// Re-setting the current status is always accepted as [`TransitionOutcome::Unchanged`].
    ///
    /// # Errors
    ///
    /// Returns [`IllegalTransition`] when the edge is not in the table and
    /// `force` is false.
    fn check_transition(
        self,
        to: Self,
        force: bool,
    ) -> Result<TransitionOutcome, IllegalTransition<Self>> {
        if self == to {
            Ok(TransitionOutcome::Unchanged)
        } else if self.allowed_next().contains(&to) {
            Ok(TransitionOutcome::Applied)
        } else if force {
            Ok(TransitionOutcome::Forced)
        } else {
            Err(IllegalTransition { from: self, to })
        }
    }
}

/// Error returned when a status string is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

// =============================================================================
// KYB status
// =============================================================================

/// Know-Your-Business verification status of a seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "marketplace.kyb_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KybStatus {
    #[default]
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

impl KybStatus {
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::UnderReview,
        Self::Approved,
        Self::Rejected,
    ];

    /// Statuses a new application may be submitted with.
    #[must_use]
    pub const fn is_submittable(self) -> bool {
        matches!(self, Self::Pending | Self::UnderReview)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::UnderReview => "UNDER_REVIEW",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl StatusMachine for KybStatus {
    fn allowed_next(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::UnderReview, Self::Approved, Self::Rejected],
            Self::UnderReview => &[Self::Approved, Self::Rejected],
            Self::Approved | Self::Rejected => &[],
        }
    }
}

impl fmt::Display for KybStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for KybStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseStatusError {
                kind: "KYB status",
                value: s.to_owned(),
            })
    }
}

/// An admin's verdict on a seller application.
///
/// The rejection reason travels with the decision so a rejection without a
/// reason cannot be expressed once this value exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationDecision {
    Approve,
    Reject { reason: String },
}

impl VerificationDecision {
    /// Build a decision from the wire form (`approved` / `rejected`).
    ///
    /// # Errors
    ///
    /// Returns a message suitable for a 400 response when the status is not
    /// `approved`/`rejected`, or when a rejection has no non-blank reason.
    pub fn from_parts(status: &str, reason: Option<&str>) -> Result<Self, String> {
        match status.trim().to_ascii_lowercase().as_str() {
            "approved" | "approve" => Ok(Self::Approve),
            "rejected" | "reject" => match reason.map(str::trim) {
                Some(reason) if !reason.is_empty() => Ok(Self::Reject {
                    reason: reason.to_owned(),
                }),
                _ => Err("Rejection reason is required".to_owned()),
            },
            _ => Err("Status must be either approved or rejected".to_owned()),
        }
    }

    #[must_use]
    pub const fn target_status(&self) -> KybStatus {
        match self {
            Self::Approve => KybStatus::Approved,
            Self::Reject { .. } => KybStatus::Rejected,
        }
    }

    #[must_use]
    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            Self::Approve => None,
            Self::Reject { reason } => Some(reason),
        }
    }
}

// =============================================================================
// Order status
// =============================================================================

/// Lifecycle status of a single order item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "marketplace.order_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    PendingPayment,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [Self; 7] = [
        Self::PendingPayment,
        Self::Paid,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
        Self::Refunded,
    ];

    /// Statuses whose amount counts toward a seller's revenue.
    #[must_use]
    pub const fn counts_as_revenue(self) -> bool {
        matches!(
            self,
            Self::Paid | Self::Processing | Self::Shipped | Self::Delivered
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingPayment => "PENDING_PAYMENT",
            Self::Paid => "PAID",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
        }
    }
}

impl StatusMachine for OrderStatus {
    fn allowed_next(self) -> &'static [Self] {
        match self {
            Self::PendingPayment => &[Self::Paid, Self::Cancelled],
            Self::Paid => &[Self::Processing, Self::Cancelled, Self::Refunded],
            Self::Processing => &[Self::Shipped, Self::Cancelled, Self::Refunded],
            Self::Shipped => &[Self::Delivered],
            Self::Delivered | Self::Cancelled | Self::Refunded => &[],
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseStatusError {
                kind: "order status",
                value: s.to_owned(),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kyb_happy_paths() {
        assert_eq!(
            KybStatus::Pending.check_transition(KybStatus::Approved, false),
            Ok(TransitionOutcome::Applied)
        );
        assert_eq!(
            KybStatus::Pending.check_transition(KybStatus::UnderReview, false),
            Ok(TransitionOutcome::Applied)
        );
        assert_eq!(
            KybStatus::UnderReview.check_transition(KybStatus::Rejected, false),
            Ok(TransitionOutcome::Applied)
        );
    }

    #[test]
    fn test_kyb_decided_is_terminal() {
        assert!(KybStatus::Approved.is_terminal());
        assert!(KybStatus::Rejected.is_terminal());
        assert_eq!(
            KybStatus::Rejected.check_transition(KybStatus::Approved, false),
            Err(IllegalTransition {
                from: KybStatus::Rejected,
                to: KybStatus::Approved
            })
        );
        assert_eq!(
            KybStatus::Rejected.check_transition(KybStatus::Approved, true),
            Ok(TransitionOutcome::Forced)
        );
    }

    #[test]
    fn test_same_status_is_unchanged() {
        for status in OrderStatus::ALL {
            assert_eq!(
                status.check_transition(status, false),
                Ok(TransitionOutcome::Unchanged)
            );
        }
    }

    #[test]
    fn test_order_forward_chain() {
        let chain = [
            OrderStatus::PendingPayment,
            OrderStatus::Paid,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ];
        for pair in chain.windows(2) {
            if let [from, to] = pair {
                assert_eq!(
                    from.check_transition(*to, false),
                    Ok(TransitionOutcome::Applied),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_order_cancel_only_before_shipping() {
        assert!(OrderStatus::Paid.allowed_next().contains(&OrderStatus::Cancelled));
        assert!(
            OrderStatus::Processing
                .allowed_next()
                .contains(&OrderStatus::Refunded)
        );
        assert!(
            OrderStatus::Shipped
                .check_transition(OrderStatus::Cancelled, false)
                .is_err()
        );
        assert!(
            OrderStatus::Delivered
                .check_transition(OrderStatus::PendingPayment, false)
                .is_err()
        );
    }

    #[test]
    fn test_revenue_statuses() {
        let revenue: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(|s| s.counts_as_revenue())
            .collect();
        assert_eq!(
            revenue,
            vec![
                OrderStatus::Paid,
                OrderStatus::Processing,
                OrderStatus::Shipped,
                OrderStatus::Delivered
            ]
        );
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(
            "pending_payment".parse::<OrderStatus>().unwrap(),
            OrderStatus::PendingPayment
        );
        assert_eq!("UNDER_REVIEW".parse::<KybStatus>().unwrap(), KybStatus::UnderReview);
        assert_eq!(OrderStatus::Refunded.to_string(), "REFUNDED");
        assert!("SHIPPING".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_serde_screaming_case() {
        let json = serde_json::to_string(&OrderStatus::PendingPayment).unwrap();
        assert_eq!(json, "\"PENDING_PAYMENT\"");
        let status: KybStatus = serde_json::from_str("\"UNDER_REVIEW\"").unwrap();
        assert_eq!(status, KybStatus::UnderReview);
    }

    #[test]
    fn test_decision_requires_reason() {
        assert_eq!(
            VerificationDecision::from_parts("approved", None).unwrap(),
            VerificationDecision::Approve
        );
        assert!(VerificationDecision::from_parts("rejected", None).is_err());
        assert!(VerificationDecision::from_parts("rejected", Some("   ")).is_err());
        let decision = VerificationDecision::from_parts("REJECTED", Some(" blurry docs ")).unwrap();
        assert_eq!(decision.rejection_reason(), Some("blurry docs"));
        assert_eq!(decision.target_status(), KybStatus::Rejected);
        assert!(VerificationDecision::from_parts("maybe", None).is_err());
    }

    #[test]
    fn test_submittable_statuses() {
        assert!(KybStatus::Pending.is_submittable());
        assert!(KybStatus::UnderReview.is_submittable());
        assert!(!KybStatus::Approved.is_submittable());
    }
}
