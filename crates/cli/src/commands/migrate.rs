//! Database migration command.
//!
//! Applies `crates/api/migrations/` to `MARKETPLACE_DATABASE_URL`. The API
//! server never migrates on start, so run this before each deploy.

use super::{CliError, connect};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the connection or any migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running marketplace migrations...");
    dmarketplace_api::db::MIGRATOR.run(&pool).await?;

    tracing::info!("Marketplace migrations complete");
    Ok(())
}
