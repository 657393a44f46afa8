//! CLI command implementations.

pub mod merchant;
pub mod migrate;
pub mod password;
pub mod token;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use dmarketplace_api::config::ConfigError;
use dmarketplace_api::db::StoreError;
use dmarketplace_api::services::VerificationError;
use dmarketplace_api::services::auth::AuthError;

/// Errors from any CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Connect using `MARKETPLACE_DATABASE_URL`, falling back to `DATABASE_URL`.
pub(crate) async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let url = std::env::var("MARKETPLACE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CliError::MissingEnvVar("MARKETPLACE_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(dmarketplace_api::db::create_pool(&SecretString::from(url)).await?)
}
