//! Authentication error types.

use thiserror::Error;

/// Errors from bearer tokens and admin password checks.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization: Bearer` header on the request.
    #[error("missing bearer token")]
    MissingToken,

    /// Token is malformed or its signature does not match.
    #[error("invalid token")]
    InvalidToken,

    /// Token signature is fine but `exp` is in the past.
    #[error("token expired")]
    Expired,

    /// Token is valid but does not grant access to this resource.
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    /// Wrong admin password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// `MARKETPLACE_ADMIN_PASSWORD_HASH` is not configured.
    #[error("admin login is disabled")]
    AdminLoginDisabled,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// The signing key was rejected by the MAC.
    #[error("signing key rejected")]
    SigningKey,

    /// Claims could not be encoded.
    #[error("token encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
