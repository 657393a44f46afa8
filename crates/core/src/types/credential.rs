//! External catalog credentials.

use core::fmt;

use serde::Deserialize;

/// Errors that can occur when constructing an [`ApiKey`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiKeyError {
    #[error("API key cannot be empty")]
    Empty,
    #[error("API key cannot contain whitespace")]
    Whitespace,
}

/// A merchant's bearer credential for the external catalog provider.
///
/// The key never appears in `Debug` output and deliberately does not implement
/// `Serialize`, so it cannot leak through a JSON response by accident. Use
/// [`ApiKey::expose`] at the single point where it is sent upstream.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct ApiKey(String);

impl ApiKey {
    /// Parse an API key, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is blank or contains inner whitespace.
    pub fn parse(s: &str) -> Result<Self, ApiKeyError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ApiKeyError::Empty);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(ApiKeyError::Whitespace);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the raw key.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short, non-reversible hint for logs (`abcd…`).
    #[must_use]
    pub fn hint(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{prefix}…")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&"[REDACTED]").finish()
    }
}

impl TryFrom<String> for ApiKey {
    type Error = ApiKeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ApiKey {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ApiKey {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ApiKey {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let key = ApiKey::parse("pf_live_supersecret").unwrap();
        let debug = format!("{key:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("supersecret"));
    }

    #[test]
    fn test_hint_shows_prefix_only() {
        let key = ApiKey::parse("pf_live_supersecret").unwrap();
        assert_eq!(key.hint(), "pf_l…");
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert_eq!(ApiKey::parse("  "), Err(ApiKeyError::Empty));
        assert_eq!(ApiKey::parse("a b"), Err(ApiKeyError::Whitespace));
    }
}
