//! Buyer carts: accumulation, overwrites, removal and the missing-cart fault.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use dmarketplace_core::WalletAddress;
use dmarketplace_integration_tests::{TestApp, TestResponse, authorized, get, json_request};

const ADD_URI: &str = "/merchant/add-printfull-product-to-cart/7001/880";

fn line(user_id: i64, variant: &str, quantity: Value) -> Value {
    json!({
        "userId": user_id,
        "variant_id": variant,
        "quantity": quantity,
        "productImg": "https://files.cdn.printful.com/hoodie.png",
        "productName": "Harbor Hoodie",
        "productPrice": "39.00"
    })
}

async fn add(app: &TestApp, body: &Value) -> TestResponse {
    app.send(json_request(Method::POST, ADD_URI, None, body)).await
}

async fn cart_items(app: &TestApp, user_id: i64) -> Vec<Value> {
    let res = app.send(get(&format!("/user/cart/{user_id}"))).await;
    assert_eq!(res.status, StatusCode::OK);
    res.body["data"]["cartItems"].as_array().unwrap().clone()
}

#[tokio::test]
async fn test_same_variant_accumulates_into_one_line() {
    let app = TestApp::spawn().await;
    let user = app.create_user("0xBUYER").await;

    let first = add(&app, &line(user, "V1", json!(1))).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.msg(), "Product added to cart successfully");

    let second = add(&app, &line(user, "V1", json!("2"))).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["data"]["quantity"], 3);
    assert_eq!(second.body["data"]["id"], first.body["data"]["id"]);

    let items = cart_items(&app, user).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 3);
}

#[tokio::test]
async fn test_numeric_and_string_variant_ids_match() {
    let app = TestApp::spawn().await;
    let user = app.create_user("0xBUYER").await;

    add(&app, &line(user, "44001", json!(1))).await;
    let mut numeric = line(user, "", json!(1));
    numeric["variant_id"] = json!(44001);
    let res = add(&app, &numeric).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["quantity"], 2);
    assert_eq!(cart_items(&app, user).await.len(), 1);
}

#[tokio::test]
async fn test_interleaved_adds_keep_one_line() {
    let app = TestApp::spawn().await;
    let user = app.create_user("0xBUYER").await;
    let body = line(user, "V9", json!(1));

    let (a, b, c, d) = tokio::join!(
        add(&app, &body),
        add(&app, &body),
        add(&app, &body),
        add(&app, &body)
    );
    for res in [a, b, c, d] {
        assert_eq!(res.status, StatusCode::OK);
    }

    let items = cart_items(&app, user).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 4);
}

#[tokio::test]
async fn test_add_to_cart_validation_order() {
    let app = TestApp::spawn().await;
    let user = app.create_user("0xBUYER").await;

    let bad_user = add(&app, &line(0, "V1", json!(1))).await;
    assert_eq!(bad_user.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_user.msg(), "Invalid user ID provided");

    let mut no_variant = line(user, "V1", json!(1));
    no_variant["variant_id"] = json!("  ");
    let res = add(&app, &no_variant).await;
    assert_eq!(res.msg(), "Invalid variant ID provided");

    let mut no_name = line(user, "V1", json!(1));
    no_name["productName"] = Value::Null;
    let res = add(&app, &no_name).await;
    assert_eq!(res.msg(), "Product image and name are required");

    let mut free = line(user, "V1", json!(1));
    free["productPrice"] = json!(0);
    let res = add(&app, &free).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.msg(), "Invalid product price provided");

    let bad_store = app
        .send(json_request(
            Method::POST,
            "/merchant/add-printfull-product-to-cart/abc/880",
            None,
            &line(user, "V1", json!(1)),
        ))
        .await;
    assert_eq!(bad_store.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_store.msg(), "Invalid store ID provided");

    assert!(cart_items(&app, user).await.is_empty());
}

#[tokio::test]
async fn test_set_quantity_overwrites() {
    let app = TestApp::spawn().await;
    let user = app.create_user("0xBUYER").await;
    let added = add(&app, &line(user, "V1", json!(3))).await;
    let item_id = added.body["data"]["id"].as_i64().unwrap();

    let res = app
        .send(json_request(
            Method::PATCH,
            &format!("/merchant/cart-item/{item_id}"),
            None,
            &json!({ "quantity": 5 }),
        ))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["quantity"], 5);
    assert_eq!(cart_items(&app, user).await[0]["quantity"], 5);

    let zero = app
        .send(json_request(
            Method::PATCH,
            &format!("/merchant/cart-item/{item_id}"),
            None,
            &json!({ "quantity": 0 }),
        ))
        .await;
    assert_eq!(zero.status, StatusCode::BAD_REQUEST);
    assert_eq!(cart_items(&app, user).await[0]["quantity"], 5);
}

#[tokio::test]
async fn test_set_quantity_on_missing_item_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app
        .send(json_request(
            Method::PATCH,
            "/merchant/cart-item/4242",
            None,
            &json!({ "quantity": 2 }),
        ))
        .await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.msg(), "Cart item not found");
}

#[tokio::test]
async fn test_remove_item() {
    let app = TestApp::spawn().await;
    let user = app.create_user("0xBUYER").await;
    let added = add(&app, &line(user, "V1", json!(1))).await;
    let item_id = added.body["data"]["id"].as_i64().unwrap();

    let res = app
        .send(authorized(
            Method::DELETE,
            &format!("/merchant/cart-item/{item_id}"),
            None,
        ))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.msg(), "product Deleted from the cart");
    assert!(cart_items(&app, user).await.is_empty());
}

#[tokio::test]
async fn test_remove_missing_item_leaves_cart_unchanged() {
    let app = TestApp::spawn().await;
    let user = app.create_user("0xBUYER").await;
    add(&app, &line(user, "V1", json!(2))).await;

    let res = app
        .send(authorized(Method::DELETE, "/merchant/cart-item/9999", None))
        .await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["success"], false);
    let items = cart_items(&app, user).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 2);
}

#[tokio::test]
async fn test_remove_with_other_owner_is_forbidden() {
    let app = TestApp::spawn().await;
    let owner = app.create_user("0xOWNER").await;
    let other = app.create_user("0xOTHER").await;
    let added = add(&app, &line(owner, "V1", json!(1))).await;
    let item_id = added.body["data"]["id"].as_i64().unwrap();

    let res = app
        .send(json_request(
            Method::DELETE,
            &format!("/merchant/cart-item/{item_id}"),
            None,
            &json!({ "userId": other }),
        ))
        .await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(cart_items(&app, owner).await.len(), 1);
}

#[tokio::test]
async fn test_user_without_cart_cannot_add_items() {
    let app = TestApp::spawn().await;
    let user = app
        .store
        .insert_user_without_cart(&WalletAddress::parse("0xABC").unwrap());
    let user_id = i64::from(user.id.as_i32());

    let res = add(&app, &line(user_id, "V1", json!(1))).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.msg(), "User cart not found. Please create a cart first.");

    // No cart was created as a side effect
    let cart = app.send(get(&format!("/user/cart/{user_id}"))).await;
    assert_eq!(cart.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_user_is_idempotent_per_wallet() {
    let app = TestApp::spawn().await;

    let first = app.create_user("0xBUYER").await;
    let second = app.create_user("0xBUYER").await;

    assert_eq!(first, second);
    assert!(cart_items(&app, first).await.is_empty());
}

#[tokio::test]
async fn test_quantity_cap_holds_for_adds_and_overwrites() {
    let app = TestApp::spawn().await;
    let user = app.create_user("0xBUYER").await;

    let huge = add(&app, &line(user, "V1", json!(i32::MAX))).await;
    assert_eq!(huge.status, StatusCode::BAD_REQUEST);
    assert_eq!(huge.msg(), "Quantity cannot exceed 10000");

    let full = add(&app, &line(user, "V1", json!(10_000))).await;
    assert_eq!(full.status, StatusCode::OK);
    let item_id = full.body["data"]["id"].as_i64().unwrap();

    let over = add(&app, &line(user, "V1", json!(1))).await;
    assert_eq!(over.status, StatusCode::CONFLICT);
    assert_eq!(over.msg(), "Cart quantity limit reached for this item");
    assert_eq!(cart_items(&app, user).await[0]["quantity"], 10_000);

    let overwrite = app
        .send(json_request(
            Method::PATCH,
            &format!("/merchant/cart-item/{item_id}"),
            None,
            &json!({ "quantity": 10_001 }),
        ))
        .await;
    assert_eq!(overwrite.status, StatusCode::BAD_REQUEST);
    assert_eq!(cart_items(&app, user).await[0]["quantity"], 10_000);
}

#[tokio::test]
async fn test_set_quantity_with_other_owner_is_forbidden() {
    let app = TestApp::spawn().await;
    let owner = app.create_user("0xOWNER").await;
    let other = app.create_user("0xOTHER").await;
    let added = add(&app, &line(owner, "V1", json!(2))).await;
    let item_id = added.body["data"]["id"].as_i64().unwrap();
    let uri = format!("/merchant/cart-item/{item_id}");

    let foreign = app
        .send(json_request(
            Method::PATCH,
            &uri,
            None,
            &json!({ "quantity": 7, "userId": other }),
        ))
        .await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);
    assert_eq!(cart_items(&app, owner).await[0]["quantity"], 2);

    let own = app
        .send(json_request(
            Method::PATCH,
            &uri,
            None,
            &json!({ "quantity": 7, "userId": owner }),
        ))
        .await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.body["data"]["quantity"], 7);
}
