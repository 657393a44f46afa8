//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::MarketplaceConfig;
use crate::db::MarketStore;
use crate::printful::PrintfulClient;
use crate::services::auth::TokenSigner;
use crate::services::{NotificationDispatcher, UploadStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the persistence gateway and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: MarketplaceConfig,
    store: Arc<dyn MarketStore>,
    printful: PrintfulClient,
    notifications: NotificationDispatcher,
    uploads: UploadStore,
    tokens: TokenSigner,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Service configuration
    /// * `store` - Persistence gateway (`PostgreSQL` or in-memory)
    /// * `printful` - Catalog provider client
    /// * `notifications` - Handle to the running notification worker
    #[must_use]
    pub fn new(
        config: MarketplaceConfig,
        store: Arc<dyn MarketStore>,
        printful: PrintfulClient,
        notifications: NotificationDispatcher,
    ) -> Self {
        let uploads = UploadStore::new(config.upload_dir.clone());
        let tokens = TokenSigner::new(&config.auth);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                printful,
                notifications,
                uploads,
                tokens,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &MarketplaceConfig {
        &self.inner.config
    }

    /// Get a reference to the persistence gateway.
    #[must_use]
    pub fn store(&self) -> &dyn MarketStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the Printful API client.
    #[must_use]
    pub fn printful(&self) -> &PrintfulClient {
        &self.inner.printful
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationDispatcher {
        &self.inner.notifications
    }

    #[must_use]
    pub fn uploads(&self) -> &UploadStore {
        &self.inner.uploads
    }

    /// Get a reference to the bearer token signer.
    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.inner.tokens
    }
}
