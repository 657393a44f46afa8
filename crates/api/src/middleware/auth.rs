//! Bearer token extractors.
//!
//! Handlers declare the role they need by taking one of these extractors.
//! A missing or bad token is rejected with 401 before the handler runs; a
//! valid token for the wrong role is rejected with 403.
//!
//! ```rust,ignore
//! async fn approve(
//!     RequireAdmin: RequireAdmin,
//!     State(state): State<AppState>,
//! ) -> Result<Json<Value>> { ... }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use dmarketplace_core::SellerId;

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::{AuthError, Principal};
use crate::state::AppState;

/// Read and verify the bearer token on a request.
fn principal_from_parts(parts: &Parts, state: &AppState) -> Result<Principal, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let principal = state.tokens().verify(token)?;
    match principal {
        Principal::Admin => set_sentry_user(&"admin"),
        Principal::Merchant { seller_id } => set_sentry_user(&format!("merchant:{seller_id}")),
    }
    Ok(principal)
}

/// Requires an admin token.
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match principal_from_parts(parts, state)? {
            Principal::Admin => Ok(Self),
            Principal::Merchant { .. } => {
                Err(AuthError::Forbidden("admin access required").into())
            }
        }
    }
}

/// Requires a merchant token and yields the merchant's seller id.
pub struct RequireMerchant(pub SellerId);

impl FromRequestParts<AppState> for RequireMerchant {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match principal_from_parts(parts, state)? {
            Principal::Merchant { seller_id } => Ok(Self(seller_id)),
            Principal::Admin => Err(AuthError::Forbidden("merchant access required").into()),
        }
    }
}

/// Requires any valid token, admin or merchant.
pub struct RequireAnyRole(pub Principal);

impl FromRequestParts<AppState> for RequireAnyRole {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(principal_from_parts(parts, state)?))
    }
}
