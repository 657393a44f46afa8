//! Admin routes: platform metrics, the merchant review queue, and decisions.
//!
//! Every handler takes [`RequireAdmin`].

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use dmarketplace_core::{KybStatus, VerificationDecision};

use crate::db::UserStore;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::services::VerificationService;
use crate::state::AppState;

use super::merchant::seller_segment;
use super::validation::{Loose, flag};

/// User, seller, pending and approved counts.
#[instrument(skip_all)]
pub async fn dashboard(_admin: RequireAdmin, State(state): State<AppState>) -> Result<Json<Value>> {
    let metrics = VerificationService::silent(state.store())
        .dashboard_metrics()
        .await?;
    Ok(Json(json!({ "success": true, "data": metrics })))
}

#[derive(Debug, Default, Deserialize)]
pub struct MerchantQuery {
    status: Option<String>,
}

/// Sellers newest first, optionally filtered by `?status=`.
#[instrument(skip(_admin, state))]
pub async fn merchants(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<MerchantQuery>,
) -> Result<Json<Value>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.parse::<KybStatus>()
                .map_err(|e| AppError::BadRequest(e.to_string()))
        })
        .transpose()?;

    let sellers = VerificationService::silent(state.store())
        .list(status)
        .await?;
    Ok(Json(json!({ "success": true, "data": sellers })))
}

/// The review queue, as summaries.
#[instrument(skip_all)]
pub async fn pending_merchants(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Value>> {
    let pending = VerificationService::silent(state.store())
        .list_pending()
        .await?;
    Ok(Json(json!({ "success": true, "data": pending })))
}

#[instrument(skip(_admin, state))]
pub async fn merchant(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(seller_id): Path<String>,
) -> Result<Json<Value>> {
    let seller = VerificationService::silent(state.store())
        .seller(seller_segment(&seller_id)?)
        .await?;
    Ok(Json(json!({ "success": true, "data": seller })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    status: Option<String>,
    rejection_reason: Option<String>,
    force: Option<Loose>,
}

/// Approve or reject a seller.
#[instrument(skip(_admin, state, body))]
pub async fn update_verification(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(seller_id): Path<String>,
    Json(body): Json<VerificationRequest>,
) -> Result<Json<Value>> {
    let seller_id = seller_segment(&seller_id)?;
    let decision = VerificationDecision::from_parts(
        body.status.as_deref().unwrap_or_default(),
        body.rejection_reason.as_deref(),
    )
    .map_err(AppError::BadRequest)?;

    let msg = match decision {
        VerificationDecision::Approve => "Seller approved",
        VerificationDecision::Reject { .. } => "Seller rejected",
    };
    let seller = VerificationService::new(state.store(), state.notifications())
        .update_verification(seller_id, decision, flag(body.force.as_ref()))
        .await?;
    Ok(Json(json!({ "success": true, "msg": msg, "data": seller })))
}

/// Move a pending application under review.
#[instrument(skip(_admin, state))]
pub async fn start_review(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(seller_id): Path<String>,
) -> Result<Json<Value>> {
    let seller = VerificationService::silent(state.store())
        .mark_under_review(seller_segment(&seller_id)?)
        .await?;
    Ok(Json(json!({ "success": true, "msg": "Seller under review", "data": seller })))
}

/// Buyers newest first.
#[instrument(skip_all)]
pub async fn users(_admin: RequireAdmin, State(state): State<AppState>) -> Result<Json<Value>> {
    let users = state.store().list_users().await?;
    Ok(Json(json!({ "success": true, "data": users })))
}
