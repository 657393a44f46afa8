//! Admin login, bearer token checks and the operational endpoints.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::json;

use dmarketplace_integration_tests::{ADMIN_PASSWORD, TestApp, authorized, get, json_request};

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn().await;

    let live = app.send(get("/health")).await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body, "ok");

    let ready = app.send(get("/health/ready")).await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_login_issues_working_token() {
    let app = TestApp::spawn().await;

    let res = app
        .send(json_request(
            Method::POST,
            "/auth/admin",
            None,
            &json!({ "password": ADMIN_PASSWORD }),
        ))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["expiresAt"].is_string());
    let token = res.body["token"].as_str().unwrap();

    let dashboard = app
        .send(authorized(Method::GET, "/admin/dashboard", Some(token)))
        .await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert_eq!(dashboard.body["success"], true);
}

#[tokio::test]
async fn test_admin_login_wrong_password() {
    let app = TestApp::spawn().await;

    let res = app
        .send(json_request(
            Method::POST,
            "/auth/admin",
            None,
            &json!({ "password": "not-the-admin-password" }),
        ))
        .await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.msg(), "Invalid credentials");
    assert!(res.body.get("token").is_none());
}

#[tokio::test]
async fn test_admin_routes_need_admin_token() {
    let app = TestApp::spawn().await;
    let seller = app.submit_store("Acme", "0x1", "a@acme.com").await;

    let anonymous = app.send(get("/admin/users")).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.msg(), "Authentication required");

    let merchant = app
        .send(authorized(
            Method::GET,
            "/admin/users",
            Some(&app.merchant_token(seller)),
        ))
        .await;
    assert_eq!(merchant.status, StatusCode::FORBIDDEN);

    let forged = app
        .send(authorized(Method::GET, "/admin/users", Some("abc.def")))
        .await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);

    // A merchant cannot approve itself
    let self_approval = app
        .send(json_request(
            Method::PATCH,
            &format!("/admin/merchants/{seller}/verification"),
            Some(&app.merchant_token(seller)),
            &json!({ "status": "approved" }),
        ))
        .await;
    assert_eq!(self_approval.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_merchant_dashboard_is_scoped_to_own_store() {
    let app = TestApp::spawn().await;
    let own = app.submit_store("Acme", "0x1", "a@acme.com").await;
    let other = app.submit_store("Bolt", "0x2", "b@bolt.com").await;
    let token = app.merchant_token(own);

    let foreign = app
        .send(authorized(
            Method::GET,
            &format!("/merchant/all-orders/{other}"),
            Some(&token),
        ))
        .await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);

    let update = app
        .send(json_request(
            Method::PUT,
            &format!("/merchant/update-seller/{own}"),
            Some(&token),
            &json!({ "shopName": "Acme Outfitters", "contactNumber": "+64 9 555 0100" }),
        ))
        .await;
    assert_eq!(update.status, StatusCode::OK);
    assert_eq!(update.body["data"]["shopName"], "Acme Outfitters");

    let empty = app
        .send(json_request(
            Method::PUT,
            &format!("/merchant/update-seller/{own}"),
            Some(&token),
            &json!({}),
        ))
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let foreign_update = app
        .send(json_request(
            Method::PUT,
            &format!("/merchant/update-seller/{other}"),
            Some(&token),
            &json!({ "shopName": "Hijacked" }),
        ))
        .await;
    assert_eq!(foreign_update.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::spawn().await;
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-abc-123")
        .body(Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app.router(), request)
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "trace-abc-123");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app.send(get("/merchant/does-not-exist")).await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
