//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`. Error bodies are `{ "success": false, "msg": ... }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;
use crate::printful::PrintfulError;
use crate::services::auth::AuthError;
use crate::services::{
    CartError, CatalogError, OrderError, UploadError, VerificationError,
};

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level error type for the REST service.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Verification error: {0}")]
    Verification(#[from] VerificationError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Database error: {0}")]
    Store(#[from] StoreError),

    /// Malformed or missing input.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn store_status(err: &StoreError) -> (StatusCode, String) {
    match err {
        StoreError::Conflict(kind) => (StatusCode::CONFLICT, kind.to_string()),
        StoreError::Database(_) | StoreError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
        }
    }
}

fn auth_status(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Authentication required".to_string()),
        AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
        AuthError::Expired => (StatusCode::UNAUTHORIZED, "Token expired".to_string()),
        AuthError::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
        }
        AuthError::Forbidden(reason) => (StatusCode::FORBIDDEN, (*reason).to_string()),
        AuthError::AdminLoginDisabled => {
            (StatusCode::FORBIDDEN, "Admin login is disabled".to_string())
        }
        AuthError::PasswordHash | AuthError::SigningKey | AuthError::Encoding(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
        }
    }
}

fn printful_status(err: &PrintfulError) -> (StatusCode, String) {
    match err {
        PrintfulError::InvalidCredential(msg) => (StatusCode::BAD_REQUEST, (*msg).to_string()),
        PrintfulError::Upstream { status, .. } => {
            let status = StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            (status, "Failed to fetch from Printful".to_string())
        }
        PrintfulError::Http(_) | PrintfulError::Parse(_) => {
            (StatusCode::BAD_GATEWAY, "Failed to fetch from Printful".to_string())
        }
    }
}

impl AppError {
    /// Status code and client-facing message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Store(err) => store_status(err),
            Self::Auth(err) => auth_status(err),
            Self::Verification(err) => match err {
                VerificationError::Store(e) => store_status(e),
                VerificationError::SellerNotFound => (StatusCode::NOT_FOUND, err.to_string()),
                VerificationError::IllegalTransition(_) => (StatusCode::CONFLICT, err.to_string()),
            },
            Self::Cart(err) => match err {
                CartError::Store(e) => store_status(e),
                CartError::CartNotFound | CartError::ItemNotFound => {
                    (StatusCode::NOT_FOUND, err.to_string())
                }
                CartError::NotOwner => (StatusCode::FORBIDDEN, err.to_string()),
                CartError::QuantityOutOfRange => (StatusCode::BAD_REQUEST, err.to_string()),
            },
            Self::Order(err) => match err {
                OrderError::Store(e) => store_status(e),
                OrderError::Auth(e) => auth_status(e),
                OrderError::OrderNotFound
                | OrderError::ItemNotFound
                | OrderError::SellerNotFound => (StatusCode::NOT_FOUND, err.to_string()),
                OrderError::IllegalTransition(_) => (StatusCode::CONFLICT, err.to_string()),
            },
            Self::Catalog(err) => match err {
                CatalogError::Store(e) => store_status(e),
                CatalogError::Auth(e) => auth_status(e),
                CatalogError::Printful(e) => printful_status(e),
                CatalogError::SellerNotFound
                | CatalogError::StoreNotFound
                | CatalogError::StoreNotConfigured
                | CatalogError::ProductNotFound => (StatusCode::NOT_FOUND, err.to_string()),
                CatalogError::StoreNotInCredential | CatalogError::InvalidProduct(_) => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
            },
            Self::Upload(err) => match err {
                UploadError::TooLarge => (StatusCode::PAYLOAD_TOO_LARGE, err.to_string()),
                UploadError::InvalidType(_) | UploadError::Multipart(_) => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                UploadError::Io(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
                }
            },
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        (status, Json(json!({ "success": false, "msg": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from the authenticated principal.
pub fn set_sentry_user(id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(id.to_string()),
            ..Default::default()
        }));
    });
}
