//! Store applications and the admin verification workflow.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::json;

use dmarketplace_api::services::email::MemoryMailer;
use dmarketplace_integration_tests::{TestApp, application, authorized, get, json_request};

#[tokio::test]
async fn test_application_is_pending_and_returns_merchant_token() {
    let app = TestApp::spawn().await;

    let res = app
        .send(application("Acme", "0x1", "a@acme.com").build())
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.msg(), "wait for admin to review and allow your application");
    assert_eq!(res.body["data"]["kybStatus"], "PENDING");
    assert_eq!(res.body["data"]["isApproved"], false);
    assert!(res.body["data"]["kybDocuments"].as_str().unwrap().starts_with("kyb"));
    assert!(res.body["data"].get("printfulApiKey").is_none());

    // The returned token opens the merchant's own dashboard
    let seller_id = res.body["data"]["id"].as_i64().unwrap();
    let token = res.body["token"].as_str().unwrap();
    let stats = app
        .send(authorized(
            Method::GET,
            &format!("/merchant/dashboard-stats/{seller_id}"),
            Some(token),
        ))
        .await;
    assert_eq!(stats.status, StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_wallet_is_rejected_and_first_seller_kept() {
    let app = TestApp::spawn().await;
    let first = app.submit_store("Acme", "0x1", "a@acme.com").await;

    let res = app
        .send(application("Other", "0x1", "b@other.com").build())
        .await;

    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.msg(), "A store with this wallet address already exists");

    let admin = app.admin_token();
    let all = app
        .send(authorized(Method::GET, "/admin/merchants", Some(&admin)))
        .await;
    let sellers = all.body["data"].as_array().unwrap();
    assert_eq!(sellers.len(), 1);
    assert_eq!(sellers[0]["id"].as_i64(), Some(first));
    assert_eq!(sellers[0]["shopName"], "Acme");
    assert_eq!(sellers[0]["businessEmail"], "a@acme.com");
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let app = TestApp::spawn().await;
    app.submit_store("Acme", "0x1", "a@acme.com").await;

    let res = app
        .send(application("Acme Two", "0x2", "A@Acme.com").build())
        .await;

    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.msg(), "A store with this business email already exists");
}

#[tokio::test]
async fn test_application_without_kyb_document_is_rejected() {
    let app = TestApp::spawn().await;
    let form = dmarketplace_integration_tests::MultipartForm::new("/merchant/create-store")
        .text("shopName", "Acme")
        .text("walletAddress", "0x1")
        .text("businessEmail", "a@acme.com");

    let res = app.send(form.build()).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.msg(), "kybDocument is required");
}

#[tokio::test]
async fn test_logo_must_be_an_image() {
    let app = TestApp::spawn().await;
    let form = application("Acme", "0x1", "a@acme.com").file(
        "image",
        "logo.exe",
        "application/octet-stream",
        b"MZ",
    );

    let res = app.send(form.build()).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.msg(), "Only image files are allowed!");

    let all = app
        .send(authorized(Method::GET, "/admin/merchants", Some(&app.admin_token())))
        .await;
    assert!(all.body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_approve_sets_flags_and_lists_store() {
    let app = TestApp::spawn().await;
    let seller = app.submit_store("Acme", "0x1", "a@acme.com").await;

    let before = app.send(get("/merchant/get-all-stores")).await;
    assert_eq!(before.body["data"].as_array().unwrap().len(), 0);

    let res = app
        .send(json_request(
            Method::PATCH,
            &format!("/admin/merchants/{seller}/verification"),
            Some(&app.admin_token()),
            &json!({ "status": "approved" }),
        ))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.msg(), "Seller approved");
    assert_eq!(res.body["data"]["kybStatus"], "APPROVED");
    assert_eq!(res.body["data"]["isApproved"], true);
    assert!(res.body["data"]["approvedAt"].is_string());
    assert!(res.body["data"]["rejectionReason"].is_null());

    let after = app.send(get("/merchant/get-all-stores")).await;
    let stores = after.body["data"].as_array().unwrap();
    assert_eq!(stores.len(), 1);
    assert_eq!(stores[0]["id"].as_i64(), Some(seller));
}

#[tokio::test]
async fn test_reject_requires_reason() {
    let app = TestApp::spawn().await;
    let seller = app.submit_store("Acme", "0x1", "a@acme.com").await;
    let admin = app.admin_token();
    let uri = format!("/admin/merchants/{seller}/verification");

    let missing = app
        .send(json_request(
            Method::PATCH,
            &uri,
            Some(&admin),
            &json!({ "status": "rejected", "rejectionReason": "   " }),
        ))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.msg(), "Rejection reason is required");

    let rejected = app
        .send(json_request(
            Method::PATCH,
            &uri,
            Some(&admin),
            &json!({ "status": "rejected", "rejectionReason": "Blurry KYB scan" }),
        ))
        .await;
    assert_eq!(rejected.status, StatusCode::OK);
    assert_eq!(rejected.body["data"]["kybStatus"], "REJECTED");
    assert_eq!(rejected.body["data"]["isApproved"], false);
    assert_eq!(rejected.body["data"]["rejectionReason"], "Blurry KYB scan");
}

#[tokio::test]
async fn test_rejecting_again_updates_reason_and_notifies() {
    let app = TestApp::spawn().await;
    let seller = app.submit_store("Acme", "0x1", "a@acme.com").await;
    let admin = app.admin_token();
    let uri = format!("/admin/merchants/{seller}/verification");

    for reason in ["Blurry KYB scan", "Expired licence"] {
        let res = app
            .send(json_request(
                Method::PATCH,
                &uri,
                Some(&admin),
                &json!({ "status": "rejected", "rejectionReason": reason }),
            ))
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["data"]["rejectionReason"], reason);
    }

    // Application receipt plus one rejection email per reason
    let sent = app.wait_for_emails(3).await;
    assert!(
        sent.iter()
            .any(|e| e.text_body.contains("Expired licence"))
    );
}

#[tokio::test]
async fn test_unknown_verification_status_is_bad_request() {
    let app = TestApp::spawn().await;
    let seller = app.submit_store("Acme", "0x1", "a@acme.com").await;

    let res = app
        .send(json_request(
            Method::PATCH,
            &format!("/admin/merchants/{seller}/verification"),
            Some(&app.admin_token()),
            &json!({ "status": "maybe" }),
        ))
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.msg(), "Status must be either approved or rejected");
}

#[tokio::test]
async fn test_decided_application_needs_force_to_change() {
    let app = TestApp::spawn().await;
    let seller = app.submit_store("Acme", "0x1", "a@acme.com").await;
    app.approve(seller).await;
    let admin = app.admin_token();
    let uri = format!("/admin/merchants/{seller}/verification");
    let reject = json!({ "status": "rejected", "rejectionReason": "Chargebacks" });

    let refused = app
        .send(json_request(Method::PATCH, &uri, Some(&admin), &reject))
        .await;
    assert_eq!(refused.status, StatusCode::CONFLICT);

    // Re-approving is a no-op, not a conflict
    let again = app
        .send(json_request(
            Method::PATCH,
            &uri,
            Some(&admin),
            &json!({ "status": "approved" }),
        ))
        .await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["data"]["kybStatus"], "APPROVED");

    let forced = app
        .send(json_request(
            Method::PATCH,
            &uri,
            Some(&admin),
            &json!({ "status": "rejected", "rejectionReason": "Chargebacks", "force": true }),
        ))
        .await;
    assert_eq!(forced.status, StatusCode::OK);
    assert_eq!(forced.body["data"]["kybStatus"], "REJECTED");
    assert_eq!(forced.body["data"]["isApproved"], false);
    assert!(forced.body["data"]["approvedAt"].is_null());
}

#[tokio::test]
async fn test_review_then_pending_queue() {
    let app = TestApp::spawn().await;
    let first = app.submit_store("Acme", "0x1", "a@acme.com").await;
    let second = app.submit_store("Bolt", "0x2", "b@bolt.com").await;
    let admin = app.admin_token();

    let review = app
        .send(authorized(
            Method::POST,
            &format!("/admin/merchants/{first}/review"),
            Some(&admin),
        ))
        .await;
    assert_eq!(review.status, StatusCode::OK);
    assert_eq!(review.body["data"]["kybStatus"], "UNDER_REVIEW");

    let pending = app
        .send(authorized(Method::GET, "/admin/merchants/pending", Some(&admin)))
        .await;
    let ids: Vec<i64> = pending.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![second]);
    assert!(pending.body["data"][0].get("walletAddress").is_none());
}

#[tokio::test]
async fn test_missing_seller_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app
        .send(json_request(
            Method::PATCH,
            "/admin/merchants/999/verification",
            Some(&app.admin_token()),
            &json!({ "status": "approved" }),
        ))
        .await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.msg(), "Seller not found");
}

#[tokio::test]
async fn test_submission_and_approval_emails() {
    let app = TestApp::spawn().await;
    let seller = app.submit_store("Acme", "0x1", "a@acme.com").await;
    app.approve(seller).await;

    // Deliveries run concurrently, so match by subject
    let sent = app.wait_for_emails(2).await;
    assert!(sent.iter().all(|e| e.to == "a@acme.com"));
    assert!(
        sent.iter()
            .any(|e| e.subject == "We received your store application")
    );
    let approval = sent
        .iter()
        .find(|e| e.subject == "Your store has been approved")
        .unwrap();
    assert!(approval.text_body.contains("Acme"));
    assert!(
        approval
            .text_body
            .contains(&format!("https://merchant.dmarketplace.test/{seller}"))
    );
}

#[tokio::test]
async fn test_mail_outage_does_not_fail_application() {
    let mailer = Arc::new(MemoryMailer::failing());
    let app = TestApp::spawn_with_mailer(mailer.clone()).await;

    let res = app
        .send(application("Acme", "0x1", "a@acme.com").build())
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);

    app.wait_for_send_attempts(1).await;
    assert!(mailer.sent().is_empty());
}
