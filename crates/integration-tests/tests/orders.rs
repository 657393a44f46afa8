//! Checkout and the order status lifecycle.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use dmarketplace_api::services::email::MemoryMailer;
use dmarketplace_integration_tests::{
    TestApp, TestResponse, authorized, fake_printful::STORE_ID, get, json_request,
};

fn checkout(user_id: i64, quantity: i64) -> Value {
    json!({
        "userId": user_id,
        "storeId": STORE_ID,
        "productId": "880",
        "variantId": 44001,
        "quantity": quantity,
        "productImg": "https://files.cdn.printful.com/hoodie.png",
        "productName": "Harbor Hoodie",
        "productPrice": "39.00",
        "deliveryAddress": "1 Quay Street",
        "userEmail": "buyer@example.org",
        "city": "Auckland",
        "zipCode": "1010",
        "state": "Auckland",
        "country": "NZ"
    })
}

struct Shop {
    app: TestApp,
    seller: i64,
    buyer: i64,
    item: i64,
}

async fn shop_with_order() -> Shop {
    let app = TestApp::spawn().await;
    let seller = app
        .submit_linked_store("Harbor Goods", "0xSELLER", "shop@harbor.test")
        .await;
    let buyer = app.create_user("0xBUYER").await;
    let res = app
        .send(json_request(Method::POST, "/user/create-order", None, &checkout(buyer, 2)))
        .await;
    assert_eq!(res.status, StatusCode::OK, "checkout failed: {}", res.body);
    let item = res.body["data"]["id"].as_i64().unwrap();
    Shop {
        app,
        seller,
        buyer,
        item,
    }
}

async fn set_status(app: &TestApp, item: i64, token: Option<&str>, body: &Value) -> TestResponse {
    app.send(json_request(
        Method::PATCH,
        &format!("/merchant/order-item/{item}/status"),
        token,
        body,
    ))
    .await
}

fn amount(value: &Value) -> f64 {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_checkout_defaults() {
    let shop = shop_with_order().await;

    let orders = shop.app.send(get(&format!("/user/orders/{}", shop.buyer))).await;
    assert_eq!(orders.status, StatusCode::OK);
    let items = orders.body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["status"], "PENDING_PAYMENT");
    assert_eq!(items[0]["variantId"], "44001");
    assert!((amount(&items[0]["totalAmount"]) - 78.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_checkout_requires_full_address() {
    let app = TestApp::spawn().await;
    let buyer = app.create_user("0xBUYER").await;
    let mut body = checkout(buyer, 1);
    body["zipCode"] = json!("");

    let res = app
        .send(json_request(Method::POST, "/user/create-order", None, &body))
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.msg(), "Shipping address is incomplete");
}

#[tokio::test]
async fn test_checkout_sends_confirmation() {
    let shop = shop_with_order().await;

    // Application receipt plus the order confirmation
    let sent = shop.app.wait_for_emails(2).await;
    let confirmation = sent
        .iter()
        .find(|e| e.subject.starts_with("Order confirmation"))
        .unwrap();
    assert_eq!(confirmation.to, "buyer@example.org");
    assert_eq!(confirmation.subject, format!("Order confirmation #{}", shop.item));
    assert!(confirmation.text_body.contains("Harbor Hoodie"));
}

#[tokio::test]
async fn test_mail_outage_does_not_fail_checkout() {
    let mailer = Arc::new(MemoryMailer::failing());
    let app = TestApp::spawn_with_mailer(mailer.clone()).await;
    app.submit_linked_store("Harbor Goods", "0xSELLER", "shop@harbor.test")
        .await;
    let buyer = app.create_user("0xBUYER").await;

    let res = app
        .send(json_request(Method::POST, "/user/create-order", None, &checkout(buyer, 1)))
        .await;
    assert_eq!(res.status, StatusCode::OK, "checkout failed: {}", res.body);

    // Application receipt plus the order confirmation
    app.wait_for_send_attempts(2).await;
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_merchant_moves_order_forward() {
    let shop = shop_with_order().await;
    let token = shop.app.merchant_token(shop.seller);

    let paid = set_status(&shop.app, shop.item, Some(&token), &json!({ "status": "PAID" })).await;
    assert_eq!(paid.status, StatusCode::OK);
    assert_eq!(paid.body["orderItem"]["status"], "PAID");

    let processing = set_status(
        &shop.app,
        shop.item,
        Some(&token),
        &json!({ "status": "processing" }),
    )
    .await;
    assert_eq!(processing.status, StatusCode::OK);
    assert_eq!(processing.body["orderItem"]["status"], "PROCESSING");

    // Re-setting the current status is a no-op
    let same = set_status(
        &shop.app,
        shop.item,
        Some(&token),
        &json!({ "status": "PROCESSING" }),
    )
    .await;
    assert_eq!(same.status, StatusCode::OK);

    let stats = shop
        .app
        .send(authorized(
            Method::GET,
            &format!("/merchant/dashboard-stats/{}", shop.seller),
            Some(&token),
        ))
        .await;
    assert_eq!(stats.body["data"]["totalOrders"], 1);
    assert!((amount(&stats.body["data"]["totalRevenue"]) - 78.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_illegal_transition_needs_admin_force() {
    let shop = shop_with_order().await;
    let merchant = shop.app.merchant_token(shop.seller);
    let admin = shop.app.admin_token();

    let skipped = set_status(
        &shop.app,
        shop.item,
        Some(&merchant),
        &json!({ "status": "DELIVERED" }),
    )
    .await;
    assert_eq!(skipped.status, StatusCode::CONFLICT);

    let merchant_force = set_status(
        &shop.app,
        shop.item,
        Some(&merchant),
        &json!({ "status": "DELIVERED", "force": true }),
    )
    .await;
    assert_eq!(merchant_force.status, StatusCode::FORBIDDEN);

    let forced = set_status(
        &shop.app,
        shop.item,
        Some(&admin),
        &json!({ "status": "DELIVERED", "force": true }),
    )
    .await;
    assert_eq!(forced.status, StatusCode::OK);
    assert_eq!(forced.body["orderItem"]["status"], "DELIVERED");
}

#[tokio::test]
async fn test_other_merchant_cannot_touch_order() {
    let shop = shop_with_order().await;
    let rival = shop.app.submit_store("Rival", "0xRIVAL", "rival@shop.test").await;

    let res = set_status(
        &shop.app,
        shop.item,
        Some(&shop.app.merchant_token(rival)),
        &json!({ "status": "PAID" }),
    )
    .await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let orders = shop.app.send(get(&format!("/user/orders/{}", shop.buyer))).await;
    assert_eq!(orders.body["data"][0]["status"], "PENDING_PAYMENT");
}

#[tokio::test]
async fn test_status_update_validation() {
    let shop = shop_with_order().await;
    let admin = shop.app.admin_token();

    let missing = set_status(&shop.app, 9999, Some(&admin), &json!({ "status": "PAID" })).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.msg(), "Order item not found");

    let unknown = set_status(&shop.app, shop.item, Some(&admin), &json!({ "status": "LOST" })).await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown.msg(), "Invalid order status");

    let anonymous = set_status(&shop.app, shop.item, None, &json!({ "status": "PAID" })).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_recent_orders_limit() {
    let shop = shop_with_order().await;
    for _ in 0..2 {
        shop.app
            .send(json_request(
                Method::POST,
                "/user/create-order",
                None,
                &checkout(shop.buyer, 1),
            ))
            .await;
    }
    let token = shop.app.merchant_token(shop.seller);

    let recent = shop
        .app
        .send(authorized(
            Method::GET,
            &format!("/merchant/recent-orders/{}?limit=2", shop.seller),
            Some(&token),
        ))
        .await;
    assert_eq!(recent.body["data"].as_array().unwrap().len(), 2);

    let all = shop
        .app
        .send(authorized(
            Method::GET,
            &format!("/merchant/all-orders/{}", shop.seller),
            Some(&token),
        ))
        .await;
    assert_eq!(all.body["data"].as_array().unwrap().len(), 3);

    let bad = shop
        .app
        .send(authorized(
            Method::GET,
            &format!("/merchant/recent-orders/{}?limit=many", shop.seller),
            Some(&token),
        ))
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}
