//! Business logic services.
//!
//! # Services
//!
//! - `verification` - Store applications, KYB review and decisions, seller profiles
//! - `cart` - One cart per buyer, find-or-increment lines per variant
//! - `orders` - Checkout lines, status transitions, seller dashboards
//! - `catalog` - Printful credential checks, catalog proxying, product import
//! - `notifications` - Detached email delivery and the gift card flow
//! - `email` - Mail transports (SMTP, log-only, in-memory)
//! - `uploads` - Store logos and KYB documents on local disk
//! - `auth` - Bearer tokens and the admin password
//!
//! Services borrow the persistence gateway for the duration of one request and
//! hold no state of their own.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod email;
pub mod notifications;
pub mod orders;
pub mod uploads;
pub mod verification;

pub use cart::{CartError, CartService};
pub use catalog::{CatalogError, CatalogService, ProductOverrides};
pub use notifications::{Notification, NotificationDispatcher, NotificationWorker};
pub use orders::{OrderError, OrderService};
pub use uploads::{UploadError, UploadStore};
pub use verification::{VerificationError, VerificationService};
