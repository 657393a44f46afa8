//! Order lifecycle: checkout lines, status changes and seller aggregates.

use thiserror::Error;

use dmarketplace_core::{
    IllegalTransition, OrderItemId, OrderStatus, SellerId, StatusMachine, StoreId,
    TransitionOutcome, UserId,
};

use crate::db::{ConflictKind, MarketStore, OrderStore, ProductStore, SellerStore, StoreError};
use crate::models::{DashboardStats, NewOrderItem, OrderItem};
use crate::services::auth::{AuthError, Principal};
use crate::services::notifications::{Notification, NotificationDispatcher};

/// Default number of orders on the merchant dashboard.
pub const DEFAULT_RECENT_ORDERS: i64 = 5;
/// Upper bound for `recent_orders`.
pub const MAX_RECENT_ORDERS: i64 = 100;

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("User order not found")]
    OrderNotFound,

    #[error("Order item not found")]
    ItemNotFound,

    #[error("Seller not found")]
    SellerNotFound,

    #[error("Invalid status change: {0}")]
    IllegalTransition(#[from] IllegalTransition<OrderStatus>),
}

/// Clamp a requested page size for recent orders.
#[must_use]
pub fn recent_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_RECENT_ORDERS)
        .clamp(1, MAX_RECENT_ORDERS)
}

pub struct OrderService<'a> {
    store: &'a dyn MarketStore,
    notifier: Option<&'a NotificationDispatcher>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn MarketStore, notifier: &'a NotificationDispatcher) -> Self {
        Self {
            store,
            notifier: Some(notifier),
        }
    }

    /// Service with no email side effects.
    #[must_use]
    pub const fn silent(store: &'a dyn MarketStore) -> Self {
        Self {
            store,
            notifier: None,
        }
    }

    /// Append a checkout line to the user's order and queue its confirmation.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` when the user has no order container.
    #[tracing::instrument(skip(self, item), fields(store_id = %item.store_id))]
    pub async fn create_order_item(
        &self,
        user_id: UserId,
        item: &NewOrderItem,
    ) -> Result<OrderItem, OrderError> {
        let order = self
            .store
            .order_for_user(user_id)
            .await?
            .ok_or(OrderError::OrderNotFound)?;
        let created = self.store.insert_order_item(order.id, item).await?;
        tracing::info!(order_item_id = %created.id, status = %created.status, "Order item created");

        if let Some(notifier) = self.notifier {
            notifier.notify(Notification::OrderConfirmation {
                item: Box::new(created.clone()),
            });
        }
        Ok(created)
    }

    /// Move an order item to `to`.
    ///
    /// Merchants may only touch items placed against their own store and may
    /// not `force`. Re-setting the current status is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `Auth(Forbidden)`, `ItemNotFound`, `IllegalTransition`, or
    /// `Store(Conflict(StaleWrite))` when the status changed concurrently.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        item_id: OrderItemId,
        to: OrderStatus,
        actor: &Principal,
        force: bool,
    ) -> Result<OrderItem, OrderError> {
        if force && !actor.is_admin() {
            return Err(AuthError::Forbidden("Only admins may force a status change").into());
        }

        let item = self
            .store
            .order_item_by_id(item_id)
            .await?
            .ok_or(OrderError::ItemNotFound)?;

        if let Principal::Merchant { seller_id } = actor {
            let owns = self
                .store
                .seller_by_id(*seller_id)
                .await?
                .is_some_and(|s| s.printful_store_id == Some(item.store_id));
            if !owns {
                return Err(AuthError::Forbidden("Order item belongs to another store").into());
            }
        }

        match item.status.check_transition(to, force)? {
            TransitionOutcome::Unchanged => return Ok(item),
            TransitionOutcome::Forced => {
                tracing::warn!(order_item_id = %item_id, from = %item.status, to = %to, "Forcing order status");
            }
            TransitionOutcome::Applied => {}
        }

        if let Some(updated) = self
            .store
            .compare_and_set_order_status(item_id, item.status, to)
            .await?
        {
            tracing::info!(order_item_id = %item_id, status = %to, "Order status updated");
            return Ok(updated);
        }
        match self.store.order_item_by_id(item_id).await? {
            None => Err(OrderError::ItemNotFound),
            Some(_) => Err(StoreError::Conflict(ConflictKind::StaleWrite).into()),
        }
    }

    /// A buyer's order items, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderItem>, OrderError> {
        Ok(self.store.order_items_for_user(user_id).await?)
    }

    async fn store_of(&self, seller_id: SellerId) -> Result<Option<StoreId>, OrderError> {
        let seller = self
            .store
            .seller_by_id(seller_id)
            .await?
            .ok_or(OrderError::SellerNotFound)?;
        Ok(seller.printful_store_id)
    }

    /// Items placed against the seller's store, newest first.
    ///
    /// A seller without a linked store has no orders.
    ///
    /// # Errors
    ///
    /// Returns `SellerNotFound` when no seller has this id.
    pub async fn list_for_seller(
        &self,
        seller_id: SellerId,
        limit: Option<i64>,
    ) -> Result<Vec<OrderItem>, OrderError> {
        match self.store_of(seller_id).await? {
            Some(store_id) => Ok(self.store.order_items_for_store(store_id, limit).await?),
            None => Ok(Vec::new()),
        }
    }

    /// The newest `limit` items (default 5, at most 100).
    ///
    /// # Errors
    ///
    /// Returns `SellerNotFound` when no seller has this id.
    pub async fn recent_orders(
        &self,
        seller_id: SellerId,
        limit: Option<i64>,
    ) -> Result<Vec<OrderItem>, OrderError> {
        self.list_for_seller(seller_id, Some(recent_limit(limit)))
            .await
    }

    /// # Errors
    ///
    /// Returns `SellerNotFound` when no seller has this id.
    pub async fn dashboard_stats(&self, seller_id: SellerId) -> Result<DashboardStats, OrderError> {
        let store_id = self.store_of(seller_id).await?;
        let products = self.store.product_counts(seller_id).await?;
        let orders = match store_id {
            Some(store_id) => self.store.order_stats_for_store(store_id).await?,
            None => crate::models::OrderStats::default(),
        };
        Ok(DashboardStats {
            total_products: products.total,
            active_products: products.active,
            total_orders: orders.total_orders,
            total_revenue: orders.total_revenue,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use dmarketplace_core::{ApiKey, Email, KybStatus, WalletAddress};

    use super::*;
    use crate::db::{MemoryStore, UserStore};
    use crate::models::NewSeller;

    fn checkout(store_id: i64, amount: i64) -> NewOrderItem {
        NewOrderItem {
            store_id: StoreId::new(store_id),
            product_id: Some("501".to_string()),
            variant_id: Some("9001".to_string()),
            product_img: "https://img.example.com/tee.png".to_string(),
            product_name: "Logo Tee".to_string(),
            product_price: Decimal::new(amount, 0),
            quantity: 1,
            total_amount: Decimal::new(amount, 0),
            status: OrderStatus::PendingPayment,
            delivery_address: "1 Main St".to_string(),
            user_email: Email::parse("buyer@example.com").unwrap(),
            city: "Berlin".to_string(),
            zip_code: "10115".to_string(),
            state: "BE".to_string(),
            country: "DE".to_string(),
        }
    }

    async fn seller_with_store(store: &MemoryStore, store_id: i64) -> SellerId {
        store
            .insert_seller(&NewSeller {
                shop_name: "Acme".to_string(),
                wallet_address: WalletAddress::parse(&format!("0xS{store_id}")).unwrap(),
                business_email: Email::parse(&format!("s{store_id}@acme.com")).unwrap(),
                description: None,
                contact_number: None,
                business_address: None,
                logo_img: None,
                kyb_documents: None,
                printful_store_id: Some(StoreId::new(store_id)),
                printful_api_key: Some(ApiKey::parse("pf_good_key").unwrap()),
                kyb_status: KybStatus::Approved,
            })
            .await
            .unwrap()
            .id
    }

    async fn buyer(store: &MemoryStore) -> UserId {
        store
            .upsert_user(&WalletAddress::parse("0xBUYER").unwrap())
            .await
            .unwrap()
            .id
    }

    #[test]
    fn test_recent_limit_clamps() {
        assert_eq!(recent_limit(None), 5);
        assert_eq!(recent_limit(Some(0)), 1);
        assert_eq!(recent_limit(Some(20)), 20);
        assert_eq!(recent_limit(Some(10_000)), 100);
    }

    #[tokio::test]
    async fn test_create_requires_order_container() {
        let store = MemoryStore::new();
        let user = store.insert_user_without_cart(&WalletAddress::parse("0xABC").unwrap());
        let service = OrderService::silent(&store);
        let err = service
            .create_order_item(user.id, &checkout(42, 25))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound));
    }

    #[tokio::test]
    async fn test_status_follows_transition_table() {
        let store = MemoryStore::new();
        let user = buyer(&store).await;
        let service = OrderService::silent(&store);
        let item = service
            .create_order_item(user, &checkout(42, 25))
            .await
            .unwrap();

        let paid = service
            .update_status(item.id, OrderStatus::Paid, &Principal::Admin, false)
            .await
            .unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);

        let again = service
            .update_status(item.id, OrderStatus::Paid, &Principal::Admin, false)
            .await
            .unwrap();
        assert_eq!(again.status, OrderStatus::Paid);

        let err = service
            .update_status(item.id, OrderStatus::PendingPayment, &Principal::Admin, false)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::IllegalTransition(_)));

        let forced = service
            .update_status(item.id, OrderStatus::PendingPayment, &Principal::Admin, true)
            .await
            .unwrap();
        assert_eq!(forced.status, OrderStatus::PendingPayment);
    }

    #[tokio::test]
    async fn test_unknown_item_is_not_found() {
        let store = MemoryStore::new();
        let service = OrderService::silent(&store);
        let err = service
            .update_status(OrderItemId::new(404), OrderStatus::Paid, &Principal::Admin, false)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::ItemNotFound));
    }

    #[tokio::test]
    async fn test_merchant_scope_and_force() {
        let store = MemoryStore::new();
        let owner = seller_with_store(&store, 42).await;
        let other = seller_with_store(&store, 77).await;
        let user = buyer(&store).await;
        let service = OrderService::silent(&store);
        let item = service
            .create_order_item(user, &checkout(42, 25))
            .await
            .unwrap();

        let err = service
            .update_status(
                item.id,
                OrderStatus::Paid,
                &Principal::Merchant { seller_id: other },
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Auth(AuthError::Forbidden(_))));

        let err = service
            .update_status(
                item.id,
                OrderStatus::Delivered,
                &Principal::Merchant { seller_id: owner },
                true,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Auth(AuthError::Forbidden(_))));

        let paid = service
            .update_status(
                item.id,
                OrderStatus::Paid,
                &Principal::Merchant { seller_id: owner },
                false,
            )
            .await
            .unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_seller_views() {
        let store = MemoryStore::new();
        let seller = seller_with_store(&store, 42).await;
        let user = buyer(&store).await;
        let service = OrderService::silent(&store);

        let first = service
            .create_order_item(user, &checkout(42, 10))
            .await
            .unwrap();
        service
            .create_order_item(user, &checkout(42, 30))
            .await
            .unwrap();
        service
            .create_order_item(user, &checkout(77, 99))
            .await
            .unwrap();
        service
            .update_status(first.id, OrderStatus::Paid, &Principal::Admin, false)
            .await
            .unwrap();

        let all = service.list_for_seller(seller, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let recent = service.recent_orders(seller, Some(1)).await.unwrap();
        assert_eq!(recent.len(), 1);

        let stats = service.dashboard_stats(seller).await.unwrap();
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.total_revenue, Decimal::new(10, 0));
        assert_eq!(stats.total_products, 0);

        assert_eq!(service.list_for_user(user).await.unwrap().len(), 3);
    }
}
