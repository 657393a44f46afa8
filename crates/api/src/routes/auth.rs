//! Token issuance for the admin dashboard.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::Result;
use crate::services::auth::{self, Principal};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    #[serde(default)]
    password: String,
}

/// Exchange the admin password for a bearer token.
#[instrument(skip_all)]
pub async fn admin_login(
    State(state): State<AppState>,
    Json(body): Json<AdminLoginRequest>,
) -> Result<Json<Value>> {
    if let Err(e) = auth::verify_admin_password(&state.config().auth, &body.password) {
        tracing::warn!(error = %e, "Admin login rejected");
        return Err(e.into());
    }

    let issued = state.tokens().issue(Principal::Admin)?;
    tracing::info!("Admin token issued");
    Ok(Json(json!({
        "success": true,
        "token": issued.token,
        "expiresAt": issued.expires_at,
    })))
}
