//! Authentication service.
//!
//! Issues and verifies stateless bearer tokens, and checks the admin password.
//!
//! A token is `base64url(claims_json) + "." + hex(hmac_sha256(base64url_part))`.
//! There is no server-side session: the signature and the `exp` claim are all
//! that is checked.

mod error;

pub use error::AuthError;

use std::time::Duration;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use dmarketplace_core::SellerId;

use crate::config::AuthConfig;

type HmacSha256 = Hmac<Sha256>;

/// Minimum admin password length accepted by `hash_password`.
const MIN_PASSWORD_LENGTH: usize = 12;

/// Who a verified token speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Principal {
    Admin,
    Merchant { seller_id: SellerId },
}

impl Principal {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Whether this principal may act on `seller_id`'s store.
    ///
    /// Admins may act on any store.
    #[must_use]
    pub fn can_manage(&self, seller_id: SellerId) -> bool {
        match self {
            Self::Admin => true,
            Self::Merchant { seller_id: own } => *own == seller_id,
        }
    }

    /// Like [`Self::can_manage`], as an error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Forbidden` when the principal is another merchant.
    pub fn ensure_can_manage(&self, seller_id: SellerId) -> Result<(), AuthError> {
        if self.can_manage(seller_id) {
            Ok(())
        } else {
            Err(AuthError::Forbidden("this store belongs to another merchant"))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    principal: Principal,
    exp: i64,
}

/// A freshly issued token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenSigner {
    key: SecretString,
    ttl: Duration,
}

impl TokenSigner {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            key: config.token_secret.clone(),
            ttl: config.token_ttl,
        }
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        <HmacSha256 as Mac>::new_from_slice(self.key.expose_secret().as_bytes())
            .map_err(|_| AuthError::SigningKey)
    }

    /// Issue a token for `principal`, valid for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Encoding` if the claims cannot be serialized.
    pub fn issue(&self, principal: Principal) -> Result<IssuedToken, AuthError> {
        self.issue_at(principal, Utc::now())
    }

    fn issue_at(&self, principal: Principal, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::hours(12));
        let expires_at = now + ttl;
        let claims = Claims {
            principal,
            exp: expires_at.timestamp(),
        };

        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(IssuedToken {
            token: format!("{payload}.{signature}"),
            expires_at,
        })
    }

    /// Verify a token and return its principal.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for malformed or forged tokens and
    /// `AuthError::Expired` once `exp` has passed.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        self.verify_at(token, Utc::now())
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, AuthError> {
        let (payload, signature) = token.split_once('.').ok_or(AuthError::InvalidToken)?;
        let signature = hex::decode(signature).map_err(|_| AuthError::InvalidToken)?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::InvalidToken)?;
        let claims: Claims = serde_json::from_slice(&json).map_err(|_| AuthError::InvalidToken)?;

        if claims.exp <= now.timestamp() {
            return Err(AuthError::Expired);
        }
        Ok(claims.principal)
    }
}

/// Check the admin password against the configured hash.
///
/// # Errors
///
/// Returns `AuthError::AdminLoginDisabled` when no hash is configured and
/// `AuthError::InvalidCredentials` when the password does not match.
pub fn verify_admin_password(config: &AuthConfig, password: &str) -> Result<(), AuthError> {
    let hash = config
        .admin_password_hash
        .as_ref()
        .ok_or(AuthError::AdminLoginDisabled)?;
    verify_password(password, hash.expose_secret())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` for passwords shorter than 12
/// characters and `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::InvalidCredentials);
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
