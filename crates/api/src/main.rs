//! dMarketplace API - REST service for the marketplace dashboards and storefront.
//!
//! This binary serves the JSON API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - `PostgreSQL` (or an in-memory store for local runs) behind `MarketStore`
//! - Printful API for merchant catalogs
//! - GIFQ for bonus gift cards, SMTP for email, both on a background worker
//!
//! Migrations are not run here; use `dm-cli migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dmarketplace_api::config::{MarketplaceConfig, StorageConfig};
use dmarketplace_api::db::{self, MarketStore, MemoryStore, PgStore};
use dmarketplace_api::gifq::GiftCardIssuer;
use dmarketplace_api::printful::PrintfulClient;
use dmarketplace_api::services::email::{LogMailer, Mailer, SmtpMailer};
use dmarketplace_api::services::{NotificationDispatcher, NotificationWorker};
use dmarketplace_api::state::AppState;

/// How long the notification worker may take to drain after shutdown.
const NOTIFICATION_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &MarketplaceConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Text logs locally, JSON on Fly.io.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dmarketplace_api=info,tower_http=debug".into());

    let json = std::env::var_os("FLY_APP_NAME").is_some();
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

async fn connect_store(storage: &StorageConfig) -> Arc<dyn MarketStore> {
    match storage {
        StorageConfig::Postgres { database_url } => {
            let pool = db::create_pool(database_url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");
            Arc::new(PgStore::new(pool))
        }
        StorageConfig::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    }
}

fn build_mailer(config: &MarketplaceConfig) -> Arc<dyn Mailer> {
    match &config.email {
        Some(email) => Arc::new(SmtpMailer::new(email).expect("Failed to configure SMTP transport")),
        None => {
            tracing::warn!("SMTP is not configured; emails will be logged and skipped");
            Arc::new(LogMailer)
        }
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = MarketplaceConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    let store = connect_store(&config.storage).await;
    let printful = PrintfulClient::new(&config.printful).expect("Failed to build Printful client");
    let gift_cards =
        GiftCardIssuer::from_config(&config.gifq).expect("Failed to build GIFQ client");
    if gift_cards.is_none() {
        tracing::info!("GIFQ_API_KEY not set; gift cards are disabled");
    }

    let worker = NotificationWorker::new(
        build_mailer(&config),
        gift_cards,
        config.merchant_dashboard_url.clone(),
    );
    let (notifications, worker_handle) = NotificationDispatcher::spawn(worker);

    let state = AppState::new(config.clone(), store, printful, notifications);

    let app = dmarketplace_api::app(state.clone())
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    // Start server
    let addr = config.socket_addr();
    tracing::info!("dmarketplace-api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    // The worker stops once the last dispatcher handle is gone
    drop(state);
    match tokio::time::timeout(NOTIFICATION_DRAIN_TIMEOUT, worker_handle).await {
        Ok(Ok(())) => tracing::info!("Notification queue drained"),
        Ok(Err(e)) => tracing::error!(error = %e, "Notification worker failed"),
        Err(_) => tracing::warn!("Gave up waiting for the notification queue"),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
