//! Core types for dMarketplace.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod credential;
pub mod email;
pub mod id;
pub mod price;
pub mod status;
pub mod wallet;

pub use credential::{ApiKey, ApiKeyError};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use status::*;
pub use wallet::{WalletAddress, WalletAddressError};
