//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Merchant (storefront facing)
//! POST   /merchant/create-store                          - Store application (multipart)
//! POST   /merchant/verify-printful-api                   - Check a Printful key
//! GET    /merchant/get-all-stores                        - Approved stores
//! GET    /merchant/store-products/{store_id}             - Printful catalog proxy
//! GET    /merchant/single-product/{store_id}/{product_id}
//! POST   /merchant/add-printfull-product-to-cart/{store_id}/{product_id}
//! DELETE /merchant/cart-item/{id}                        - Remove a cart line
//! PATCH  /merchant/cart-item/{id}                        - Overwrite quantity
//! GET    /merchant/store/{store_id}/wallet               - Payout wallet
//! GET    /merchant/store_api_key/{store_id}              - Stored key (merchant/admin)
//! PATCH  /merchant/order-item/{id}/status                - Order status (merchant/admin)
//!
//! # Merchant dashboard
//! GET    /merchant/seller-info/{seller_id}
//! PUT    /merchant/update-seller/{seller_id}             - (merchant)
//! POST   /merchant/connect-printful                      - (merchant)
//! GET    /merchant/products/{seller_id}
//! POST   /merchant/import-printfull-product              - (merchant)
//! DELETE /merchant/delete-product/{product_id}           - (merchant)
//! GET    /merchant/dashboard-stats/{seller_id}           - (merchant/admin)
//! GET    /merchant/recent-orders/{seller_id}?limit=N     - (merchant/admin)
//! GET    /merchant/all-orders/{seller_id}                - (merchant/admin)
//!
//! # Buyers
//! POST   /user/create-user
//! GET    /user/cart/{user_id}
//! POST   /user/create-order
//! GET    /user/orders/{user_id}
//!
//! # Admin (admin token)
//! GET    /admin/dashboard
//! GET    /admin/merchants?status=
//! GET    /admin/merchants/pending
//! GET    /admin/merchants/{id}
//! PATCH  /admin/merchants/{id}/verification
//! POST   /admin/merchants/{id}/review
//! GET    /admin/users
//!
//! # Auth
//! POST   /auth/admin                                     - Admin password login
//! ```

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod merchant;
pub mod user;
pub mod validation;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the merchant routes router.
pub fn merchant_routes() -> Router<AppState> {
    let mut applications =
        Router::new().route("/create-store", post(merchant::create_store));
    if let Some(limiter) = api_rate_limiter() {
        applications = applications.layer(limiter);
    }

    Router::new()
        .route("/verify-printful-api", post(merchant::verify_printful_api))
        .route("/get-all-stores", get(merchant::get_all_stores))
        .route("/store-products/{store_id}", get(merchant::store_products))
        .route(
            "/single-product/{store_id}/{product_id}",
            get(merchant::single_product),
        )
        .route(
            "/add-printfull-product-to-cart/{store_id}/{product_id}",
            post(merchant::add_to_cart),
        )
        .route(
            "/cart-item/{cart_item_id}",
            patch(merchant::set_cart_item_quantity).delete(merchant::remove_cart_item),
        )
        .route("/store/{store_id}/wallet", get(merchant::store_wallet))
        .route("/store_api_key/{store_id}", get(merchant::store_api_key))
        .route(
            "/order-item/{order_item_id}/status",
            patch(merchant::update_order_status),
        )
        // Dashboard
        .route("/seller-info/{seller_id}", get(dashboard::seller_info))
        .route("/update-seller/{seller_id}", put(dashboard::update_seller))
        .route("/connect-printful", post(dashboard::connect_printful))
        .route("/products/{seller_id}", get(dashboard::seller_products))
        .route(
            "/import-printfull-product",
            post(dashboard::import_product),
        )
        .route(
            "/delete-product/{product_id}",
            delete(dashboard::delete_product),
        )
        .route("/dashboard-stats/{seller_id}", get(dashboard::dashboard_stats))
        .route("/recent-orders/{seller_id}", get(dashboard::recent_orders))
        .route("/all-orders/{seller_id}", get(dashboard::all_orders))
        .merge(applications)
}

/// Create the buyer routes router.
pub fn user_routes() -> Router<AppState> {
    let mut sign_up = Router::new().route("/create-user", post(user::create_user));
    if let Some(limiter) = api_rate_limiter() {
        sign_up = sign_up.layer(limiter);
    }

    Router::new()
        .route("/cart/{user_id}", get(user::cart))
        .route("/create-order", post(user::create_order))
        .route("/orders/{user_id}", get(user::orders))
        .merge(sign_up)
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/merchants", get(admin::merchants))
        .route("/merchants/pending", get(admin::pending_merchants))
        .route("/merchants/{seller_id}", get(admin::merchant))
        .route(
            "/merchants/{seller_id}/verification",
            patch(admin::update_verification),
        )
        .route("/merchants/{seller_id}/review", post(admin::start_review))
        .route("/users", get(admin::users))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let router = Router::new().route("/admin", post(auth::admin_login));
    match auth_rate_limiter() {
        Some(limiter) => router.layer(limiter),
        None => router,
    }
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/merchant", merchant_routes())
        .nest("/user", user_routes())
        .nest("/admin", admin_routes())
        .nest("/auth", auth_routes())
}
