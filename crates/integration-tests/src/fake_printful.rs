//! Local stand-in for the Printful API.
//!
//! One key reaches one store with one product. Any other key gets the 401
//! Printful returns for revoked tokens.

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use url::Url;

pub const GOOD_KEY: &str = "pf_integration_key";
pub const STORE_ID: i64 = 7001;
pub const PRODUCT_ID: i64 = 880;
pub const VARIANT_ID: i64 = 44_001;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {GOOD_KEY}"))
}

fn for_store(headers: &HeaderMap) -> bool {
    headers
        .get("x-pf-store-id")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == STORE_ID.to_string())
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "code": 401, "result": "Unauthorized", "error": { "reason": "Unauthorized" } })),
    )
}

fn product() -> Value {
    json!({
        "id": PRODUCT_ID,
        "external_id": "ext-880",
        "name": "Harbor Hoodie",
        "variants": 1,
        "synced": 1,
        "thumbnail_url": "https://files.cdn.printful.com/hoodie.png",
        "is_ignored": false
    })
}

async fn stores(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({ "code": 200, "result": [{ "id": STORE_ID, "name": "Harbor Goods", "type": "native" }] })),
    )
}

async fn products(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    if !for_store(&headers) {
        return (StatusCode::NOT_FOUND, Json(json!({ "code": 404, "result": "Not found" })));
    }
    (
        StatusCode::OK,
        Json(json!({ "code": 200, "result": [product()], "paging": { "total": 1, "offset": 0, "limit": 20 } })),
    )
}

async fn product_detail(headers: HeaderMap, Path(id): Path<i64>) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    if id != PRODUCT_ID || !for_store(&headers) {
        return (StatusCode::NOT_FOUND, Json(json!({ "code": 404, "result": "Not found" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "code": 200,
            "result": {
                "sync_product": product(),
                "sync_variants": [{ "id": VARIANT_ID, "retail_price": "39.00", "currency": "USD" }]
            }
        })),
    )
}

/// Serve on an ephemeral port and return the base URL.
///
/// # Panics
///
/// Panics if no local port can be bound.
pub async fn serve() -> Url {
    let app = Router::new()
        .route("/stores", get(stores))
        .route("/store/products", get(products))
        .route("/store/products/{id}", get(product_detail));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake printful");
    let addr = listener.local_addr().expect("fake printful address");
    tokio::spawn(async move { axum::serve(listener, app).await });
    Url::parse(&format!("http://{addr}/")).expect("fake printful URL")
}
