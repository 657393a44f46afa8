//! In-process Printful stand-in for unit tests.

use axum::{Json, Router, extract::Path, http::HeaderMap, http::StatusCode, routing::get};
use serde_json::json;
use url::Url;

/// Key that reaches store 42.
pub const GOOD_KEY: &str = "pf_good_key";
/// Key Printful accepts but that reaches no store.
pub const EMPTY_KEY: &str = "pf_no_stores";
pub const STORE_ID: i64 = 42;

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .trim_start_matches("Bearer ")
        .to_string()
}

fn store_header(headers: &HeaderMap) -> String {
    headers
        .get("x-pf-store-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Serve the fake on an ephemeral port and return its base URL.
#[allow(clippy::unwrap_used)]
pub async fn serve() -> Url {
    let app = Router::new()
        .route(
            "/stores",
            get(|headers: HeaderMap| async move {
                match bearer(&headers).as_str() {
                    GOOD_KEY => (
                        StatusCode::OK,
                        Json(json!({ "code": 200, "result": [{ "id": STORE_ID, "name": "Main" }] })),
                    ),
                    EMPTY_KEY => (StatusCode::OK, Json(json!({ "code": 200, "result": [] }))),
                    _ => (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({ "code": 401, "error": { "message": "Unauthorized" } })),
                    ),
                }
            }),
        )
        .route(
            "/store/products",
            get(|headers: HeaderMap| async move {
                if store_header(&headers) == STORE_ID.to_string() {
                    (
                        StatusCode::OK,
                        Json(json!({ "code": 200, "result": [{ "id": 501, "name": "Logo Tee" }] })),
                    )
                } else {
                    (StatusCode::NOT_FOUND, Json(json!({ "code": 404 })))
                }
            }),
        )
        .route(
            "/store/products/{id}",
            get(|Path(id): Path<i64>| async move {
                if id == 404 {
                    return (StatusCode::NOT_FOUND, Json(json!({ "code": 404 })));
                }
                (
                    StatusCode::OK,
                    Json(json!({
                        "code": 200,
                        "result": {
                            "sync_product": {
                                "id": id,
                                "name": "Logo Tee",
                                "variants": 2,
                                "synced": 2,
                                "thumbnail_url": "https://files.cdn.printful.com/tee.png"
                            },
                            "sync_variants": [{ "id": 9001 }, { "id": 9002 }]
                        }
                    })),
                )
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    Url::parse(&format!("http://{addr}/")).unwrap()
}
