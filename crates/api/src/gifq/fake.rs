//! In-process GIFQ stand-in for unit tests.
//!
//! Orders report `processing` until the `complete_after`-th poll, then
//! `final_status`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{Json, Router, extract::State, routing::get};
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

use super::GiftCardIssuer;
use crate::config::{GifqConfig, GifqMode};

#[derive(Clone)]
struct FakeGifq {
    polls: Arc<AtomicU32>,
    complete_after: u32,
    final_status: &'static str,
    reference: Arc<Mutex<Option<String>>>,
}

#[allow(clippy::unwrap_used)]
async fn serve(fake: FakeGifq) -> Url {
    let app = Router::new()
        .route(
            "/api/products",
            get(|| async {
                Json(json!([
                    { "brand": "amazon", "title": "Amazon", "products": [
                        { "currency": "EUR", "min_face_value": 15, "countries": ["DE"] }
                    ]}
                ]))
            }),
        )
        .route(
            "/api/orders",
            get(|State(fake): State<FakeGifq>| async move {
                let n = fake.polls.fetch_add(1, Ordering::SeqCst) + 1;
                let reference = fake.reference.lock().unwrap().clone();
                let status = if n >= fake.complete_after {
                    fake.final_status
                } else {
                    "processing"
                };
                Json(json!([{ "id": 77, "reference": reference, "status": status }]))
            })
            .post(
                |State(fake): State<FakeGifq>, Json(body): Json<Value>| async move {
                    *fake.reference.lock().unwrap() =
                        body["reference"].as_str().map(String::from);
                    Json(json!({ "id": 77, "status": "processing" }))
                },
            ),
        )
        .route(
            "/api/orders/{id}",
            get(|| async {
                Json(json!({
                    "id": 77,
                    "status": "completed",
                    "currency": "EUR",
                    "face_value": 15,
                    "redeem_details": { "code": "AMZ-1234", "pin": "9999" }
                }))
            }),
        )
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    Url::parse(&format!("http://{addr}/api/")).unwrap()
}

/// A live-mode issuer against a fresh fake, plus its poll counter.
#[allow(clippy::unwrap_used)]
pub async fn issuer(
    complete_after: u32,
    final_status: &'static str,
    attempts: u32,
    poll_interval: Duration,
) -> (GiftCardIssuer, Arc<AtomicU32>) {
    let polls = Arc::new(AtomicU32::new(0));
    let base = serve(FakeGifq {
        polls: polls.clone(),
        complete_after,
        final_status,
        reference: Arc::new(Mutex::new(None)),
    })
    .await;
    let config = GifqConfig {
        api_key: Some(SecretString::from("gifq_test_token")),
        api_base: base,
        mode: GifqMode::Live,
        poll_attempts: attempts,
        poll_interval,
        timeout: Duration::from_secs(5),
    };
    (GiftCardIssuer::from_config(&config).unwrap().unwrap(), polls)
}
