//! dMarketplace Core - Shared domain types.
//!
//! This crate provides the types used across all dMarketplace components:
//! - `api` - The REST service (merchant onboarding, carts, orders, catalog sync)
//! - `cli` - Command-line tools for migrations and merchant management
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database access,
//! no HTTP clients. Status transition tables live here so that every caller
//! (HTTP handlers, CLI, tests) validates transitions the same way.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, wallet addresses, prices, credentials and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
