//! Merchant review commands.
//!
//! These run the same verification workflow as the admin dashboard, without
//! the approval email.

use dmarketplace_api::db::PgStore;
use dmarketplace_api::services::VerificationService;
use dmarketplace_core::{SellerId, VerificationDecision};

use super::{CliError, connect};

/// Print applications waiting for review, newest first.
///
/// # Errors
///
/// Returns an error if the database cannot be queried.
pub async fn pending() -> Result<(), CliError> {
    let store = PgStore::new(connect().await?);
    let pending = VerificationService::silent(&store).list_pending().await?;

    #[allow(clippy::print_stdout)]
    {
        if pending.is_empty() {
            println!("No pending merchants.");
        }
        for seller in &pending {
            println!(
                "{}\t{}\t{}\t{}",
                seller.id,
                seller.shop_name,
                seller.business_email,
                seller.created_at.format("%Y-%m-%d %H:%M")
            );
        }
    }
    Ok(())
}

/// Approve seller `id`.
///
/// # Errors
///
/// Returns an error if the seller is missing or already decided (without `force`).
pub async fn approve(id: i32, force: bool) -> Result<(), CliError> {
    decide(id, VerificationDecision::Approve, force).await
}

/// Reject seller `id` with `reason`.
///
/// # Errors
///
/// Returns an error for a blank reason, a missing seller, or an already
/// decided application (without `force`).
pub async fn reject(id: i32, reason: &str, force: bool) -> Result<(), CliError> {
    let decision =
        VerificationDecision::from_parts("rejected", Some(reason)).map_err(CliError::InvalidInput)?;
    decide(id, decision, force).await
}

async fn decide(id: i32, decision: VerificationDecision, force: bool) -> Result<(), CliError> {
    let store = PgStore::new(connect().await?);
    let seller = VerificationService::silent(&store)
        .update_verification(SellerId::new(id), decision, force)
        .await?;

    tracing::info!(
        seller_id = %seller.id,
        status = %seller.kyb_status,
        "Verification updated"
    );
    Ok(())
}
