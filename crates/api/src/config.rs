//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MARKETPLACE_TOKEN_SECRET` - Bearer token signing secret (min 32 chars, high entropy)
//! - `MARKETPLACE_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; not needed when `MARKETPLACE_STORAGE=memory`)
//!
//! ## Optional
//! - `MARKETPLACE_STORAGE` - `postgres` (default) or `memory`
//! - `MARKETPLACE_HOST` - Bind address (default: 127.0.0.1)
//! - `MARKETPLACE_PORT` - Listen port (default: 3000)
//! - `MARKETPLACE_UPLOAD_DIR` - Root directory for uploaded files (default: uploads)
//! - `MARKETPLACE_CORS_ORIGINS` - Comma-separated allowed origins (default: any)
//! - `MARKETPLACE_TOKEN_TTL_HOURS` - Bearer token lifetime (default: 12)
//! - `MARKETPLACE_ADMIN_PASSWORD_HASH` - Argon2 PHC hash; admin login is disabled without it
//! - `MERCHANT_DASHBOARD_URL` - Base URL used in approval emails
//! - `PRINTFUL_API_BASE` - Printful API base URL (default: <https://api.printful.com>)
//! - `OUTBOUND_TIMEOUT_SECS` - Timeout for every outbound HTTP call (default: 30)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SENDER_EMAIL` -
//!   all or nothing; emails are logged and skipped when absent
//! - `GIFQ_API_KEY` - Gift card provider token; gift cards are disabled when absent
//! - `GIFQ_ENV` - `sandbox` (default) or `production`
//! - `GIFQ_MODE` - `mock` (default) or `live`
//! - `GIFQ_POLL_ATTEMPTS` - Gift card status polls (default: 15)
//! - `GIFQ_POLL_INTERVAL_SECS` - Seconds between polls (default: 3)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Marketplace service configuration.
#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    /// Where marketplace data lives
    pub storage: StorageConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Root directory for uploaded logos and KYB documents
    pub upload_dir: PathBuf,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    /// Bearer token and admin login settings
    pub auth: AuthConfig,
    /// External catalog provider settings
    pub printful: PrintfulConfig,
    /// SMTP settings; `None` logs emails instead of sending them
    pub email: Option<EmailConfig>,
    /// Gift card provider settings
    pub gifq: GifqConfig,
    /// Merchant dashboard base URL, linked from approval emails
    pub merchant_dashboard_url: Url,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 - 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 - 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Backing store selection.
#[derive(Clone)]
pub enum StorageConfig {
    /// `PostgreSQL` (production).
    Postgres {
        /// Connection URL (contains password)
        database_url: SecretString,
    },
    /// Process-local store; data is lost on restart.
    Memory,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("database_url", &"[REDACTED]")
                .finish(),
            Self::Memory => f.write_str("Memory"),
        }
    }
}

/// Bearer token configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC key for signing bearer tokens
    pub token_secret: SecretString,
    /// Token lifetime
    pub token_ttl: Duration,
    /// Argon2 PHC string for the admin password
    pub admin_password_hash: Option<SecretString>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field(
                "admin_password_hash",
                &self.admin_password_hash.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Printful API configuration.
#[derive(Debug, Clone)]
pub struct PrintfulConfig {
    /// API base URL
    pub api_base: Url,
    /// Timeout applied to every outbound request
    pub timeout: Duration,
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Whether gift cards are really purchased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GifqMode {
    /// Synthesize a completed card without calling the provider.
    Mock,
    /// Purchase through the provider API.
    Live,
}

/// GIFQ gift card provider configuration.
#[derive(Clone)]
pub struct GifqConfig {
    /// API token; `None` disables gift cards
    pub api_key: Option<SecretString>,
    /// API base URL (sandbox or production)
    pub api_base: Url,
    /// Mock or live purchasing
    pub mode: GifqMode,
    /// Number of status polls before giving up
    pub poll_attempts: u32,
    /// Delay between polls
    pub poll_interval: Duration,
    /// Timeout applied to every outbound request
    pub timeout: Duration,
}

impl std::fmt::Debug for GifqConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GifqConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base.as_str())
            .field("mode", &self.mode)
            .field("poll_attempts", &self.poll_attempts)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl MarketplaceConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let storage = match get_env_or_default("MARKETPLACE_STORAGE", "postgres").as_str() {
            "postgres" => StorageConfig::Postgres {
                database_url: get_database_url("MARKETPLACE_DATABASE_URL")?,
            },
            "memory" => StorageConfig::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "MARKETPLACE_STORAGE".to_string(),
                    format!("expected postgres or memory, got {other}"),
                ));
            }
        };
        let host = parse_env("MARKETPLACE_HOST", "127.0.0.1")?;
        let port = parse_env("MARKETPLACE_PORT", "3000")?;
        let upload_dir = PathBuf::from(get_env_or_default("MARKETPLACE_UPLOAD_DIR", "uploads"));
        let cors_origins = parse_list(&get_env_or_default("MARKETPLACE_CORS_ORIGINS", ""));

        let outbound_timeout = Duration::from_secs(parse_env("OUTBOUND_TIMEOUT_SECS", "30")?);

        let auth = AuthConfig::from_env()?;
        let printful = PrintfulConfig {
            api_base: parse_url("PRINTFUL_API_BASE", "https://api.printful.com")?,
            timeout: outbound_timeout,
        };
        let email = EmailConfig::from_env()?;
        let gifq = GifqConfig::from_env(outbound_timeout)?;
        let merchant_dashboard_url = parse_url(
            "MERCHANT_DASHBOARD_URL",
            "https://dmarketplace-merchant.vercel.app",
        )?;

        Ok(Self {
            storage,
            host,
            port,
            upload_dir,
            cors_origins,
            auth,
            printful,
            email,
            gifq,
            merchant_dashboard_url,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl AuthConfig {
    /// Load token settings without the rest of the service configuration.
    ///
    /// Used by the CLI, which only needs to mint tokens.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the token secret is missing or weak, or the
    /// TTL is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token_secret = get_validated_secret("MARKETPLACE_TOKEN_SECRET")?;
        validate_secret_length(&token_secret, "MARKETPLACE_TOKEN_SECRET")?;
        let ttl_hours: u64 = parse_env("MARKETPLACE_TOKEN_TTL_HOURS", "12")?;

        Ok(Self {
            token_secret,
            token_ttl: Duration::from_secs(ttl_hours * 3600),
            admin_password_hash: get_optional_env("MARKETPLACE_ADMIN_PASSWORD_HASH")
                .map(SecretString::from),
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        const KEYS: [&str; 4] = ["SMTP_HOST", "SMTP_USERNAME", "SMTP_PASSWORD", "SENDER_EMAIL"];

        let present = KEYS
            .iter()
            .filter(|key| get_optional_env(key).is_some())
            .count();
        if present == 0 {
            return Ok(None);
        }
        if present < KEYS.len() {
            let missing = KEYS
                .iter()
                .find(|key| get_optional_env(key).is_none())
                .copied()
                .unwrap_or("SMTP_HOST");
            return Err(ConfigError::MissingEnvVar(format!(
                "{missing} (SMTP settings must be provided together)"
            )));
        }

        Ok(Some(Self {
            smtp_host: get_required_env("SMTP_HOST")?,
            smtp_port: parse_env("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SENDER_EMAIL")?,
        }))
    }
}

impl GifqConfig {
    fn from_env(timeout: Duration) -> Result<Self, ConfigError> {
        let api_base = match get_env_or_default("GIFQ_ENV", "sandbox").as_str() {
            "production" => parse_url("GIFQ_API_BASE", "https://api.gifq.com/api/")?,
            "sandbox" => parse_url("GIFQ_API_BASE", "https://api-sandbox.gifq.com/api/")?,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "GIFQ_ENV".to_string(),
                    format!("expected sandbox or production, got {other}"),
                ));
            }
        };
        let mode = match get_env_or_default("GIFQ_MODE", "mock").as_str() {
            "live" => GifqMode::Live,
            "mock" => GifqMode::Mock,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "GIFQ_MODE".to_string(),
                    format!("expected mock or live, got {other}"),
                ));
            }
        };

        Ok(Self {
            api_key: get_optional_env("GIFQ_API_KEY").map(SecretString::from),
            api_base,
            mode,
            poll_attempts: parse_env("GIFQ_POLL_ATTEMPTS", "15")?,
            poll_interval: Duration::from_secs(parse_env("GIFQ_POLL_INTERVAL_SECS", "3")?),
            timeout,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_url(key: &str, default: &str) -> Result<Url, ConfigError> {
    parse_env(key, default)
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Validate that a secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-token-secret-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("abababababababababababababababab", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_secret_length() {
        assert!(validate_secret_length(&SecretString::from("short"), "TEST").is_err());
        assert!(validate_secret_length(&SecretString::from("a".repeat(32)), "TEST").is_ok());
    }

    #[test]
    fn test_parse_list_skips_blanks() {
        assert_eq!(
            parse_list(" https://a.example , ,https://b.example"),
            vec!["https://a.example", "https://b.example"]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_storage_debug_redacts_url() {
        let storage = StorageConfig::Postgres {
            database_url: SecretString::from("postgres://user:hunter2@db/market"),
        };
        let debug = format!("{storage:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_email_config_debug_redacts_password() {
        let config = EmailConfig {
            smtp_host: "smtp.mailhost.test".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("smtp_pass_value"),
            from_address: "noreply@dmarketplace.test".to_string(),
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("smtp.mailhost.test"));
        assert!(!debug.contains("smtp_pass_value"));
    }

    #[test]
    fn test_auth_config_debug_redacts_secrets() {
        let config = AuthConfig {
            token_secret: SecretString::from("k8#Qz!v2Lm9@Xp4$Tn7&Rw1*Hy6^Jb3%"),
            token_ttl: Duration::from_secs(3600),
            admin_password_hash: Some(SecretString::from("$argon2id$v=19$hash")),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("k8#Qz"));
        assert!(!debug.contains("argon2id"));
    }
}
