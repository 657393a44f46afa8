//! Cart engine: one cart per buyer, one line per variant.

use thiserror::Error;

use dmarketplace_core::{CartItemId, UserId};

use crate::db::{CartStore, MarketStore, StoreError};
use crate::models::{CartDetails, CartItem, MAX_CART_QUANTITY, NewCartItem};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("User cart not found. Please create a cart first.")]
    CartNotFound,

    #[error("Cart item not found")]
    ItemNotFound,

    #[error("Cart item belongs to another user")]
    NotOwner,

    #[error("Quantity must be between 1 and {}", MAX_CART_QUANTITY)]
    QuantityOutOfRange,
}

const fn check_quantity(quantity: i32) -> Result<i32, CartError> {
    if quantity < 1 || quantity > MAX_CART_QUANTITY {
        return Err(CartError::QuantityOutOfRange);
    }
    Ok(quantity)
}

pub struct CartService<'a> {
    store: &'a dyn MarketStore,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn MarketStore) -> Self {
        Self { store }
    }

    /// Add `item` to the user's cart, accumulating quantity on an existing
    /// line for the same variant.
    ///
    /// # Errors
    ///
    /// Returns `CartNotFound` when the user has no cart; a cart is never
    /// created here. Returns `QuantityOutOfRange` for a quantity outside
    /// `1..=MAX_CART_QUANTITY`, and a `QuantityLimit` conflict when the
    /// accumulated line would exceed it.
    #[tracing::instrument(skip(self, item), fields(variant = %item.variant_id, quantity = item.quantity))]
    pub async fn add_item(&self, user_id: UserId, item: &NewCartItem) -> Result<CartItem, CartError> {
        check_quantity(item.quantity)?;
        let cart = self
            .store
            .cart_for_user(user_id)
            .await?
            .ok_or(CartError::CartNotFound)?;
        Ok(self.store.add_cart_item(cart.id, item).await?)
    }

    /// Delete a cart line.
    ///
    /// With `owner`, the line must sit in that user's cart.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` or `NotOwner`; the cart is unchanged in both cases.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        item_id: CartItemId,
        owner: Option<UserId>,
    ) -> Result<(), CartError> {
        self.owned_item(item_id, owner).await?;

        if self.store.delete_cart_item(item_id).await? {
            Ok(())
        } else {
            Err(CartError::ItemNotFound)
        }
    }

    /// Overwrite a line's quantity.
    ///
    /// With `owner`, the line must sit in that user's cart.
    ///
    /// # Errors
    ///
    /// Returns `QuantityOutOfRange`, `ItemNotFound` or `NotOwner`.
    #[tracing::instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        item_id: CartItemId,
        quantity: i32,
        owner: Option<UserId>,
    ) -> Result<CartItem, CartError> {
        check_quantity(quantity)?;
        self.owned_item(item_id, owner).await?;
        self.store
            .set_cart_item_quantity(item_id, quantity)
            .await?
            .ok_or(CartError::ItemNotFound)
    }

    async fn owned_item(
        &self,
        item_id: CartItemId,
        owner: Option<UserId>,
    ) -> Result<CartItem, CartError> {
        let item = self
            .store
            .cart_item_by_id(item_id)
            .await?
            .ok_or(CartError::ItemNotFound)?;

        if let Some(owner) = owner {
            let owns = self
                .store
                .cart_for_user(owner)
                .await?
                .is_some_and(|cart| cart.id == item.cart_id);
            if !owns {
                return Err(CartError::NotOwner);
            }
        }
        Ok(item)
    }

    /// # Errors
    ///
    /// Returns `CartNotFound` when the user has no cart.
    pub async fn cart_details(&self, user_id: UserId) -> Result<CartDetails, CartError> {
        let cart = self
            .store
            .cart_for_user(user_id)
            .await?
            .ok_or(CartError::CartNotFound)?;
        let cart_items = self.store.cart_items(cart.id).await?;
        Ok(CartDetails { cart, cart_items })
    }
}
