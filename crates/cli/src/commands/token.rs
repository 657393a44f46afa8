//! Bearer token issuance.
//!
//! Uses `MARKETPLACE_TOKEN_SECRET` and `MARKETPLACE_TOKEN_TTL_HOURS`, so
//! tokens printed here are accepted by a server with the same settings.

use dmarketplace_api::config::AuthConfig;
use dmarketplace_api::services::auth::{Principal, TokenSigner};
use dmarketplace_core::SellerId;

use super::CliError;

/// Print an admin token.
///
/// # Errors
///
/// Returns an error if the token secret is missing or weak.
pub fn admin() -> Result<(), CliError> {
    issue(Principal::Admin)
}

/// Print a token for seller `seller_id`.
///
/// # Errors
///
/// Returns an error if the token secret is missing or weak.
pub fn merchant(seller_id: i32) -> Result<(), CliError> {
    issue(Principal::Merchant {
        seller_id: SellerId::new(seller_id),
    })
}

fn issue(principal: Principal) -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    let config = AuthConfig::from_env()?;
    let issued = TokenSigner::new(&config).issue(principal)?;

    tracing::info!(expires_at = %issued.expires_at, "Token issued");
    #[allow(clippy::print_stdout)]
    {
        println!("{}", issued.token);
    }
    Ok(())
}
