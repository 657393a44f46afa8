//! In-process implementation of the persistence gateway.
//!
//! Used by tests and by `MARKETPLACE_STORAGE=memory`. All tables sit behind one
//! mutex, so every trait method is atomic with respect to the others, which
//! mirrors the single-statement guarantees `PgStore` relies on.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use dmarketplace_core::{
    ApiKey, CartId, CartItemId, KybStatus, OrderId, OrderItemId, OrderStatus, ProductId,
    SellerId, StoreId, UserId, WalletAddress,
};

use super::{
    CartStore, ConflictKind, MarketStore, OrderStore, ProductStore, SellerStore, StoreError,
    UserStore,
};
use crate::models::{
    Cart, CartItem, MAX_CART_QUANTITY, NewCartItem, NewOrderItem, NewProduct, NewSeller, Order,
    OrderItem, OrderStats, Product, ProductCounts, Seller, SellerCount, SellerProfileUpdate, User,
    VerificationUpdate,
};

#[derive(Default)]
struct Sequence(i32);

impl Sequence {
    fn next(&mut self) -> i32 {
        self.0 += 1;
        self.0
    }
}

#[derive(Default)]
struct Tables {
    sellers: BTreeMap<SellerId, Seller>,
    users: BTreeMap<UserId, User>,
    carts: BTreeMap<CartId, Cart>,
    cart_items: BTreeMap<CartItemId, CartItem>,
    orders: BTreeMap<OrderId, Order>,
    order_items: BTreeMap<OrderItemId, OrderItem>,
    products: BTreeMap<ProductId, Product>,
    seller_seq: Sequence,
    user_seq: Sequence,
    cart_seq: Sequence,
    cart_item_seq: Sequence,
    order_seq: Sequence,
    order_item_seq: Sequence,
    product_seq: Sequence,
}

impl Tables {
    fn seller_conflict(
        &self,
        except: Option<SellerId>,
        wallet: Option<&WalletAddress>,
        email: Option<&dmarketplace_core::Email>,
        store_id: Option<StoreId>,
    ) -> Option<ConflictKind> {
        let others = self
            .sellers
            .values()
            .filter(|s| Some(s.id) != except)
            .collect::<Vec<_>>();
        if wallet.is_some_and(|w| others.iter().any(|s| &s.wallet_address == w)) {
            return Some(ConflictKind::DuplicateWallet);
        }
        if email.is_some_and(|e| others.iter().any(|s| &s.business_email == e)) {
            return Some(ConflictKind::DuplicateEmail);
        }
        if store_id.is_some_and(|id| others.iter().any(|s| s.printful_store_id == Some(id))) {
            return Some(ConflictKind::DuplicateStore);
        }
        None
    }

    fn insert_user(&mut self, wallet: &WalletAddress) -> User {
        let user = User {
            id: UserId::new(self.user_seq.next()),
            wallet_address: wallet.clone(),
            created_at: Utc::now(),
        };
        self.users.insert(user.id, user.clone());
        user
    }
}

/// Persistence gateway backed by in-process maps.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock cannot leave a table half-written:
        // every mutation below is a single map operation.
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a buyer without the cart and order that normally come with it.
    ///
    /// Reproduces a data-integrity fault for tests of the not-found paths.
    pub fn insert_user_without_cart(&self, wallet: &WalletAddress) -> User {
        self.tables().insert_user(wallet)
    }
}

fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl SellerStore for MemoryStore {
    async fn insert_seller(&self, seller: &NewSeller) -> Result<Seller, StoreError> {
        let mut tables = self.tables();
        if let Some(kind) = tables.seller_conflict(
            None,
            Some(&seller.wallet_address),
            Some(&seller.business_email),
            seller.printful_store_id,
        ) {
            return Err(StoreError::Conflict(kind));
        }

        let now = Utc::now();
        let created = Seller {
            id: SellerId::new(tables.seller_seq.next()),
            shop_name: seller.shop_name.clone(),
            wallet_address: seller.wallet_address.clone(),
            business_email: seller.business_email.clone(),
            description: seller.description.clone(),
            contact_number: seller.contact_number.clone(),
            business_address: seller.business_address.clone(),
            logo_img: seller.logo_img.clone(),
            kyb_documents: seller.kyb_documents.clone(),
            printful_store_id: seller.printful_store_id,
            printful_api_key: seller.printful_api_key.clone(),
            kyb_status: seller.kyb_status,
            is_approved: false,
            approved_at: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        tables.sellers.insert(created.id, created.clone());
        Ok(created)
    }

    async fn seller_by_id(&self, id: SellerId) -> Result<Option<Seller>, StoreError> {
        Ok(self.tables().sellers.get(&id).cloned())
    }

    async fn seller_by_store(&self, store_id: StoreId) -> Result<Option<Seller>, StoreError> {
        Ok(self
            .tables()
            .sellers
            .values()
            .find(|s| s.printful_store_id == Some(store_id))
            .cloned())
    }

    async fn list_sellers(&self, status: Option<KybStatus>) -> Result<Vec<Seller>, StoreError> {
        let mut sellers: Vec<Seller> = self
            .tables()
            .sellers
            .values()
            .filter(|s| status.is_none_or(|wanted| s.kyb_status == wanted))
            .cloned()
            .collect();
        newest_first(&mut sellers, |s| (s.created_at, s.id.as_i32()));
        Ok(sellers)
    }

    async fn apply_verification(
        &self,
        id: SellerId,
        expected: KybStatus,
        update: &VerificationUpdate,
    ) -> Result<Option<Seller>, StoreError> {
        let mut tables = self.tables();
        let Some(seller) = tables.sellers.get_mut(&id) else {
            return Ok(None);
        };
        if seller.kyb_status != expected {
            return Ok(None);
        }
        seller.kyb_status = update.status();
        seller.is_approved = update.is_approved();
        seller.approved_at = update.approved_at();
        seller.rejection_reason = update.rejection_reason().map(String::from);
        seller.updated_at = Utc::now();
        Ok(Some(seller.clone()))
    }

    async fn update_seller_profile(
        &self,
        id: SellerId,
        update: &SellerProfileUpdate,
    ) -> Result<Option<Seller>, StoreError> {
        let mut tables = self.tables();
        if !tables.sellers.contains_key(&id) {
            return Ok(None);
        }
        if let Some(kind) =
            tables.seller_conflict(Some(id), None, update.business_email.as_ref(), None)
        {
            return Err(StoreError::Conflict(kind));
        }
        let Some(seller) = tables.sellers.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(shop_name) = &update.shop_name {
            seller.shop_name.clone_from(shop_name);
        }
        if let Some(email) = &update.business_email {
            seller.business_email = email.clone();
        }
        if let Some(contact) = &update.contact_number {
            seller.contact_number = Some(contact.clone());
        }
        if let Some(description) = &update.description {
            seller.description = Some(description.clone());
        }
        if let Some(address) = &update.business_address {
            seller.business_address = Some(address.clone());
        }
        seller.updated_at = Utc::now();
        Ok(Some(seller.clone()))
    }

    async fn set_printful_credentials(
        &self,
        id: SellerId,
        store_id: StoreId,
        api_key: &ApiKey,
    ) -> Result<Option<Seller>, StoreError> {
        let mut tables = self.tables();
        if !tables.sellers.contains_key(&id) {
            return Ok(None);
        }
        if let Some(kind) = tables.seller_conflict(Some(id), None, None, Some(store_id)) {
            return Err(StoreError::Conflict(kind));
        }
        let Some(seller) = tables.sellers.get_mut(&id) else {
            return Ok(None);
        };
        seller.printful_store_id = Some(store_id);
        seller.printful_api_key = Some(api_key.clone());
        seller.updated_at = Utc::now();
        Ok(Some(seller.clone()))
    }

    async fn count_sellers(&self, which: SellerCount) -> Result<i64, StoreError> {
        let tables = self.tables();
        let count = tables
            .sellers
            .values()
            .filter(|s| match which {
                SellerCount::All => true,
                SellerCount::WithStatus(status) => s.kyb_status == status,
                SellerCount::Approved => s.kyb_status == KybStatus::Approved && s.is_approved,
            })
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn upsert_user(&self, wallet: &WalletAddress) -> Result<User, StoreError> {
        let mut tables = self.tables();
        if let Some(existing) = tables.users.values().find(|u| &u.wallet_address == wallet) {
            return Ok(existing.clone());
        }

        let user = tables.insert_user(wallet);
        let cart = Cart {
            id: CartId::new(tables.cart_seq.next()),
            user_id: user.id,
            created_at: user.created_at,
        };
        tables.carts.insert(cart.id, cart);
        let order = Order {
            id: OrderId::new(tables.order_seq.next()),
            user_id: user.id,
            created_at: user.created_at,
        };
        tables.orders.insert(order.id, order);
        Ok(user)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables().users.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.tables().users.values().cloned().collect();
        newest_first(&mut users, |u| (u.created_at, u.id.as_i32()));
        Ok(users)
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        Ok(i64::try_from(self.tables().users.len()).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>, StoreError> {
        Ok(self
            .tables()
            .carts
            .values()
            .find(|c| c.user_id == user_id)
            .cloned())
    }

    async fn cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, StoreError> {
        Ok(self
            .tables()
            .cart_items
            .values()
            .filter(|i| i.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn add_cart_item(
        &self,
        cart_id: CartId,
        item: &NewCartItem,
    ) -> Result<CartItem, StoreError> {
        let mut tables = self.tables();
        let now = Utc::now();

        if let Some(existing) = tables
            .cart_items
            .values_mut()
            .find(|i| i.cart_id == cart_id && i.variant_id == item.variant_id)
        {
            let quantity = existing
                .quantity
                .checked_add(item.quantity)
                .filter(|q| *q <= MAX_CART_QUANTITY)
                .ok_or(StoreError::Conflict(ConflictKind::QuantityLimit))?;
            existing.quantity = quantity;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let created = CartItem {
            id: CartItemId::new(tables.cart_item_seq.next()),
            cart_id,
            store_id: item.store_id,
            product_id: item.product_id.clone(),
            variant_id: item.variant_id.clone(),
            product_img: item.product_img.clone(),
            product_name: item.product_name.clone(),
            product_price: item.product_price.amount(),
            quantity: item.quantity,
            created_at: now,
            updated_at: now,
        };
        tables.cart_items.insert(created.id, created.clone());
        Ok(created)
    }

    async fn cart_item_by_id(&self, id: CartItemId) -> Result<Option<CartItem>, StoreError> {
        Ok(self.tables().cart_items.get(&id).cloned())
    }

    async fn delete_cart_item(&self, id: CartItemId) -> Result<bool, StoreError> {
        Ok(self.tables().cart_items.remove(&id).is_some())
    }

    async fn set_cart_item_quantity(
        &self,
        id: CartItemId,
        quantity: i32,
    ) -> Result<Option<CartItem>, StoreError> {
        let mut tables = self.tables();
        Ok(tables.cart_items.get_mut(&id).map(|item| {
            item.quantity = quantity;
            item.updated_at = Utc::now();
            item.clone()
        }))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn order_for_user(&self, user_id: UserId) -> Result<Option<Order>, StoreError> {
        Ok(self
            .tables()
            .orders
            .values()
            .find(|o| o.user_id == user_id)
            .cloned())
    }

    async fn insert_order_item(
        &self,
        order_id: OrderId,
        item: &NewOrderItem,
    ) -> Result<OrderItem, StoreError> {
        let mut tables = self.tables();
        let now = Utc::now();
        let created = OrderItem {
            id: OrderItemId::new(tables.order_item_seq.next()),
            order_id,
            store_id: item.store_id,
            product_id: item.product_id.clone(),
            variant_id: item.variant_id.clone(),
            product_img: item.product_img.clone(),
            product_name: item.product_name.clone(),
            product_price: item.product_price,
            quantity: item.quantity,
            total_amount: item.total_amount,
            status: item.status,
            delivery_address: item.delivery_address.clone(),
            user_email: item.user_email.clone(),
            city: item.city.clone(),
            zip_code: item.zip_code.clone(),
            state: item.state.clone(),
            country: item.country.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.order_items.insert(created.id, created.clone());
        Ok(created)
    }

    async fn order_item_by_id(&self, id: OrderItemId) -> Result<Option<OrderItem>, StoreError> {
        Ok(self.tables().order_items.get(&id).cloned())
    }

    async fn compare_and_set_order_status(
        &self,
        id: OrderItemId,
        expected: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<OrderItem>, StoreError> {
        let mut tables = self.tables();
        let Some(item) = tables.order_items.get_mut(&id) else {
            return Ok(None);
        };
        if item.status != expected {
            return Ok(None);
        }
        item.status = to;
        item.updated_at = Utc::now();
        Ok(Some(item.clone()))
    }

    async fn order_items_for_user(&self, user_id: UserId) -> Result<Vec<OrderItem>, StoreError> {
        let tables = self.tables();
        let order_ids: Vec<OrderId> = tables
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .map(|o| o.id)
            .collect();
        let mut items: Vec<OrderItem> = tables
            .order_items
            .values()
            .filter(|i| order_ids.contains(&i.order_id))
            .cloned()
            .collect();
        newest_first(&mut items, |i| (i.created_at, i.id.as_i32()));
        Ok(items)
    }

    async fn order_items_for_store(
        &self,
        store_id: StoreId,
        limit: Option<i64>,
    ) -> Result<Vec<OrderItem>, StoreError> {
        let mut items: Vec<OrderItem> = self
            .tables()
            .order_items
            .values()
            .filter(|i| i.store_id == store_id)
            .cloned()
            .collect();
        newest_first(&mut items, |i| (i.created_at, i.id.as_i32()));
        if let Some(limit) = limit {
            items.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(items)
    }

    async fn order_stats_for_store(&self, store_id: StoreId) -> Result<OrderStats, StoreError> {
        let tables = self.tables();
        let items = tables.order_items.values().filter(|i| i.store_id == store_id);
        let mut stats = OrderStats::default();
        for item in items {
            stats.total_orders += 1;
            if item.status.counts_as_revenue() {
                stats.total_revenue += item.total_amount;
            }
        }
        Ok(stats)
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert_product(&self, product: &NewProduct) -> Result<Product, StoreError> {
        let mut tables = self.tables();
        let duplicate = tables.products.values().any(|p| {
            p.seller_id == product.seller_id
                && p.external_product_id == product.external_product_id
        });
        if duplicate {
            return Err(StoreError::Conflict(ConflictKind::DuplicateProduct));
        }

        let created = Product {
            id: ProductId::new(tables.product_seq.next()),
            seller_id: product.seller_id,
            external_product_id: product.external_product_id,
            name: product.name.clone(),
            thumbnail_url: product.thumbnail_url.clone(),
            variant_count: product.variant_count,
            description: product.description.clone(),
            price: product.price.amount(),
            quantity: product.quantity,
            category: product.category.clone(),
            created_at: Utc::now(),
        };
        tables.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.tables().products.get(&id).cloned())
    }

    async fn products_for_seller(
        &self,
        seller_id: SellerId,
    ) -> Result<Vec<Product>, StoreError> {
        let mut products: Vec<Product> = self
            .tables()
            .products
            .values()
            .filter(|p| p.seller_id == seller_id)
            .cloned()
            .collect();
        newest_first(&mut products, |p| (p.created_at, p.id.as_i32()));
        Ok(products)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        Ok(self.tables().products.remove(&id).is_some())
    }

    async fn product_counts(&self, seller_id: SellerId) -> Result<ProductCounts, StoreError> {
        let tables = self.tables();
        let mut counts = ProductCounts::default();
        for product in tables.products.values().filter(|p| p.seller_id == seller_id) {
            counts.total += 1;
            if product.quantity > 0 {
                counts.active += 1;
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Sum helper kept next to the store so stats stay consistent with it.
#[must_use]
pub fn revenue_of(items: &[OrderItem]) -> Decimal {
    items
        .iter()
        .filter(|i| i.status.counts_as_revenue())
        .map(|i| i.total_amount)
        .sum()
}
