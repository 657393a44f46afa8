//! End-to-end harness for the dMarketplace API.
//!
//! Each [`TestApp`] is a complete router over a fresh `MemoryStore`, a
//! recording mailer and its own fake Printful server, so tests never share
//! state and need no database.
//!
//! ```rust,ignore
//! let app = TestApp::spawn().await;
//! let res = app.send(get("/health")).await;
//! assert_eq!(res.status, StatusCode::OK);
//! ```

pub mod fake_printful;
mod form;

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::Value;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use url::Url;
use uuid::Uuid;

use dmarketplace_api::config::{
    AuthConfig, GifqConfig, GifqMode, MarketplaceConfig, PrintfulConfig, StorageConfig,
};
use dmarketplace_api::db::MemoryStore;
use dmarketplace_api::printful::PrintfulClient;
use dmarketplace_api::services::auth::{Principal, TokenSigner, hash_password};
use dmarketplace_api::services::email::{MemoryMailer, OutgoingEmail};
use dmarketplace_api::services::{NotificationDispatcher, NotificationWorker};
use dmarketplace_api::state::AppState;
use dmarketplace_core::SellerId;

pub use form::MultipartForm;

/// Password accepted by `POST /auth/admin`.
pub const ADMIN_PASSWORD: &str = "integration-admin-passphrase";

const TOKEN_SECRET: &str = "k9Qw2vXr7LpT4mZs8NbH3cYf6JdG1uEa";

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    /// JSON body, or the raw text as a JSON string when the body is not JSON.
    pub body: Value,
}

impl TestResponse {
    /// `body.msg` as text, empty when absent.
    #[must_use]
    pub fn msg(&self) -> &str {
        self.body["msg"].as_str().unwrap_or_default()
    }
}

/// One isolated API instance.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<MemoryMailer>,
    tokens: TokenSigner,
    upload_dir: PathBuf,
    _worker: JoinHandle<()>,
}

impl TestApp {
    /// Build the router with in-memory storage and a local Printful fake.
    ///
    /// # Panics
    ///
    /// Panics if the fake provider cannot bind or the admin hash fails.
    pub async fn spawn() -> Self {
        Self::spawn_with_mailer(Arc::new(MemoryMailer::new())).await
    }

    /// Like [`TestApp::spawn`], delivering mail through `mailer`.
    ///
    /// # Panics
    ///
    /// Panics if the fake provider cannot bind or the admin hash fails.
    pub async fn spawn_with_mailer(mailer: Arc<MemoryMailer>) -> Self {
        let upload_dir = std::env::temp_dir().join(format!("dmarketplace-it-{}", Uuid::new_v4()));
        let auth = AuthConfig {
            token_secret: SecretString::from(TOKEN_SECRET),
            token_ttl: Duration::from_secs(3600),
            admin_password_hash: Some(SecretString::from(
                hash_password(ADMIN_PASSWORD).expect("admin password should hash"),
            )),
        };
        let dashboard_url =
            Url::parse("https://merchant.dmarketplace.test").expect("static URL is valid");

        let config = MarketplaceConfig {
            storage: StorageConfig::Memory,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            upload_dir: upload_dir.clone(),
            cors_origins: Vec::new(),
            auth,
            printful: PrintfulConfig {
                api_base: fake_printful::serve().await,
                timeout: Duration::from_secs(5),
            },
            email: None,
            gifq: GifqConfig {
                api_key: None,
                api_base: Url::parse("http://127.0.0.1:9/api/").expect("static URL is valid"),
                mode: GifqMode::Mock,
                poll_attempts: 1,
                poll_interval: Duration::from_millis(10),
                timeout: Duration::from_secs(1),
            },
            merchant_dashboard_url: dashboard_url.clone(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        };

        let store = Arc::new(MemoryStore::new());
        let printful = PrintfulClient::new(&config.printful).expect("printful client should build");
        let (notifications, worker) =
            NotificationDispatcher::spawn(NotificationWorker::new(mailer.clone(), None, dashboard_url));
        let tokens = TokenSigner::new(&config.auth);

        let state = AppState::new(config, store.clone(), printful, notifications);

        Self {
            router: dmarketplace_api::app(state),
            store,
            mailer,
            tokens,
            upload_dir,
            _worker: worker,
        }
    }

    /// The router, for tests that need raw response headers.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run one request through the full middleware stack.
    ///
    /// # Panics
    ///
    /// Panics if the router fails or the body cannot be read.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body should be readable");
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        TestResponse { status, body }
    }

    /// # Panics
    ///
    /// Panics if the token cannot be signed.
    #[must_use]
    pub fn admin_token(&self) -> String {
        self.tokens
            .issue(Principal::Admin)
            .expect("admin token should sign")
            .token
    }

    /// # Panics
    ///
    /// Panics if the token cannot be signed.
    #[must_use]
    pub fn merchant_token(&self, seller_id: i64) -> String {
        let seller_id = SellerId::new(i32::try_from(seller_id).expect("seller id fits i32"));
        self.tokens
            .issue(Principal::Merchant { seller_id })
            .expect("merchant token should sign")
            .token
    }

    /// Submit a minimal application and return the new seller's id.
    ///
    /// # Panics
    ///
    /// Panics unless the application is accepted.
    pub async fn submit_store(&self, shop_name: &str, wallet: &str, email: &str) -> i64 {
        let res = self.send(application(shop_name, wallet, email).build()).await;
        assert_eq!(res.status, StatusCode::OK, "application rejected: {}", res.body);
        res.body["data"]["id"].as_i64().expect("seller id in response")
    }

    /// Submit an application already linked to the fake Printful store.
    ///
    /// # Panics
    ///
    /// Panics unless the application is accepted.
    pub async fn submit_linked_store(&self, shop_name: &str, wallet: &str, email: &str) -> i64 {
        let form = application(shop_name, wallet, email)
            .text("api_key", fake_printful::GOOD_KEY)
            .text("store_id", &fake_printful::STORE_ID.to_string());
        let res = self.send(form.build()).await;
        assert_eq!(res.status, StatusCode::OK, "application rejected: {}", res.body);
        res.body["data"]["id"].as_i64().expect("seller id in response")
    }

    /// Approve a seller through the admin API.
    ///
    /// # Panics
    ///
    /// Panics unless the approval succeeds.
    pub async fn approve(&self, seller_id: i64) {
        let res = self
            .send(json_request(
                Method::PATCH,
                &format!("/admin/merchants/{seller_id}/verification"),
                Some(&self.admin_token()),
                &serde_json::json!({ "status": "approved" }),
            ))
            .await;
        assert_eq!(res.status, StatusCode::OK, "approval failed: {}", res.body);
    }

    /// Create (or find) the buyer for `wallet` and return their id.
    ///
    /// # Panics
    ///
    /// Panics unless the user endpoint succeeds.
    pub async fn create_user(&self, wallet: &str) -> i64 {
        let res = self
            .send(json_request(
                Method::POST,
                "/user/create-user",
                None,
                &serde_json::json!({ "walletAddress": wallet }),
            ))
            .await;
        assert_eq!(res.status, StatusCode::OK, "create-user failed: {}", res.body);
        res.body["data"]["id"].as_i64().expect("user id in response")
    }

    /// Wait until at least `count` emails were delivered.
    ///
    /// # Panics
    ///
    /// Panics after two seconds without enough emails.
    pub async fn wait_for_emails(&self, count: usize) -> Vec<OutgoingEmail> {
        for _ in 0..100 {
            let sent = self.mailer.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "expected {count} emails, got {}: {:?}",
            self.mailer.sent().len(),
            self.mailer.sent()
        );
    }

    /// Wait until the mailer was asked to send at least `count` emails.
    ///
    /// # Panics
    ///
    /// Panics after two seconds without enough attempts.
    pub async fn wait_for_send_attempts(&self, count: usize) {
        for _ in 0..100 {
            if self.mailer.attempts() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "expected {count} send attempts, got {}",
            self.mailer.attempts()
        );
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

/// A `create-store` form with the required fields and a PDF KYB document.
#[must_use]
pub fn application(shop_name: &str, wallet: &str, email: &str) -> MultipartForm {
    MultipartForm::new("/merchant/create-store")
        .text("shopName", shop_name)
        .text("walletAddress", wallet)
        .text("businessEmail", email)
        .file("kybDocument", "kyb.pdf", "application/pdf", b"%PDF-1.4 test")
}

/// # Panics
///
/// Panics if the request cannot be built.
#[must_use]
pub fn get(uri: &str) -> Request<Body> {
    authorized(Method::GET, uri, None)
}

/// A bodyless request, optionally with a bearer token.
///
/// # Panics
///
/// Panics if the request cannot be built.
#[must_use]
pub fn authorized(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request should build")
}

/// A JSON request, optionally with a bearer token.
///
/// # Panics
///
/// Panics if the request cannot be built.
#[must_use]
pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request should build")
}
