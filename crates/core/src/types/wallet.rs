//! Wallet address type.
//!
//! Wallet addresses identify both buyers and sellers. They are opaque to the
//! marketplace: no checksum or chain-specific format is enforced, only that the
//! value is a single non-empty token. Case is preserved because some chains
//! use mixed-case checksummed encodings.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`WalletAddress`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletAddressError {
    #[error("wallet address cannot be empty")]
    Empty,
    #[error("wallet address must be at most {max} characters")]
    TooLong { max: usize },
    #[error("wallet address cannot contain whitespace")]
    Whitespace,
}

/// A buyer or seller wallet address.
///
/// ```
/// use dmarketplace_core::WalletAddress;
///
/// assert_eq!(WalletAddress::parse(" 0xABC ").unwrap().as_str(), "0xABC");
/// assert!(WalletAddress::parse("").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Maximum accepted length.
    pub const MAX_LENGTH: usize = 128;

    /// Parse a wallet address, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than
    /// [`Self::MAX_LENGTH`], or contains inner whitespace.
    pub fn parse(s: &str) -> Result<Self, WalletAddressError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(WalletAddressError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(WalletAddressError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(WalletAddressError::Whitespace);
        }
        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for WalletAddress {
    type Err = WalletAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = WalletAddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for WalletAddress {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for WalletAddress {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for WalletAddress {
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
    fn test_parse_preserves_case() {
        let wallet = WalletAddress::parse("0xAbCdEf").unwrap();
        assert_eq!(wallet.as_str(), "0xAbCdEf");
        assert_ne!(wallet, WalletAddress::parse("0xabcdef").unwrap());
    }

    #[test]
    fn test_parse_rejects_blank_and_spaced() {
        assert_eq!(WalletAddress::parse(" \t"), Err(WalletAddressError::Empty));
        assert_eq!(
            WalletAddress::parse("0x1 0x2"),
            Err(WalletAddressError::Whitespace)
        );
    }

    #[test]
    fn test_parse_too_long() {
        let long = "a".repeat(WalletAddress::MAX_LENGTH + 1);
        assert!(matches!(
            WalletAddress::parse(&long),
            Err(WalletAddressError::TooLong { .. })
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let wallet: WalletAddress = serde_json::from_str("\"0x1\"").unwrap();
        assert_eq!(wallet.to_string(), "0x1");
        assert!(serde_json::from_str::<WalletAddress>("\"\"").is_err());
    }
}
