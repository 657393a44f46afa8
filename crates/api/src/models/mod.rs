//! Domain models for the marketplace.
//!
//! These types represent validated domain objects separate from database row
//! types. They serialize in the camelCase shape the dashboards consume.

pub mod order;
pub mod product;
pub mod seller;
pub mod user;

pub use order::{DashboardStats, NewOrderItem, Order, OrderItem, OrderStats};
pub use product::{NewProduct, Product, ProductCounts};
pub use seller::{
    NewSeller, PlatformMetrics, Seller, SellerCount, SellerProfileUpdate, SellerSummary,
    VerificationUpdate,
};
pub use user::{Cart, CartDetails, CartItem, MAX_CART_QUANTITY, NewCartItem, User};
