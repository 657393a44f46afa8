//! Buyer routes: identity, cart view, checkout lines, order history.

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use dmarketplace_core::{Email, OrderStatus, Price, StoreId, UserId, WalletAddress};

use crate::db::UserStore;
use crate::error::{AppError, Result};
use crate::models::NewOrderItem;
use crate::services::{CartService, OrderService};
use crate::state::AppState;

use super::validation::{Loose, id_segment, positive_id, positive_int, quantity_or_one, required_text};

fn user_segment(segment: &str) -> Result<UserId> {
    id_segment(segment, "Invalid user ID provided").map(UserId::new)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    wallet_address: Option<String>,
}

/// Find or create the buyer for a wallet, with their cart and order container.
#[instrument(skip(state, body))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<Json<Value>> {
    let wallet = WalletAddress::parse(body.wallet_address.as_deref().unwrap_or_default())
        .map_err(|e| AppError::BadRequest(format!("Invalid wallet address: {e}")))?;
    let user = state.store().upsert_user(&wallet).await?;
    tracing::debug!(user_id = %user.id, "User resolved");
    Ok(Json(json!({ "success": true, "msg": "user ready", "data": user })))
}

/// A buyer's cart with its lines.
#[instrument(skip(state))]
pub async fn cart(State(state): State<AppState>, Path(user_id): Path<String>) -> Result<Json<Value>> {
    let details = CartService::new(state.store())
        .cart_details(user_segment(&user_id)?)
        .await?;
    Ok(Json(json!({ "success": true, "data": details })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    user_id: Option<Loose>,
    store_id: Option<Loose>,
    product_id: Option<Loose>,
    variant_id: Option<Loose>,
    quantity: Option<Loose>,
    product_img: Option<Loose>,
    product_name: Option<Loose>,
    product_price: Option<Loose>,
    total_amount: Option<Loose>,
    status: Option<String>,
    delivery_address: Option<Loose>,
    user_email: Option<String>,
    city: Option<Loose>,
    zip_code: Option<Loose>,
    state: Option<Loose>,
    country: Option<Loose>,
}

impl CreateOrderRequest {
    fn into_parts(self) -> Result<(UserId, NewOrderItem)> {
        let user_id = UserId::new(positive_id(self.user_id.as_ref(), "Invalid user ID provided")?);
        let store_id = StoreId::new(positive_int(self.store_id.as_ref(), "Invalid store ID provided")?);
        let quantity = quantity_or_one(self.quantity.as_ref())?;

        let image_and_name = "Product image and name are required";
        let product_img = required_text(self.product_img.as_ref(), image_and_name)?;
        let product_name = required_text(self.product_name.as_ref(), image_and_name)?;

        let price = self
            .product_price
            .as_ref()
            .and_then(Loose::decimal)
            .and_then(|amount| Price::new(amount).ok())
            .ok_or_else(|| AppError::BadRequest("Invalid product price provided".to_string()))?;
        let total_amount = match self.total_amount.as_ref() {
            None => price.times(quantity),
            Some(total) => total
                .decimal()
                .filter(|t| *t >= Decimal::ZERO)
                .ok_or_else(|| AppError::BadRequest("Invalid total amount".to_string()))?,
        };

        let status = match self.status.as_deref() {
            None => OrderStatus::PendingPayment,
            Some(s) => s
                .parse::<OrderStatus>()
                .map_err(|_| AppError::BadRequest("Invalid order status".to_string()))?,
        };

        let user_email = Email::parse(self.user_email.as_deref().unwrap_or_default())
            .map_err(|e| AppError::BadRequest(format!("Invalid email address: {e}")))?;

        let address = "Shipping address is incomplete";
        let item = NewOrderItem {
            store_id,
            product_id: self.product_id.as_ref().and_then(Loose::text),
            variant_id: self.variant_id.as_ref().and_then(Loose::text),
            product_img,
            product_name,
            product_price: price.amount(),
            quantity,
            total_amount,
            status,
            delivery_address: required_text(self.delivery_address.as_ref(), address)?,
            user_email,
            city: required_text(self.city.as_ref(), address)?,
            zip_code: required_text(self.zip_code.as_ref(), address)?,
            state: required_text(self.state.as_ref(), address)?,
            country: required_text(self.country.as_ref(), address)?,
        };
        Ok((user_id, item))
    }
}

/// Record a checkout line and queue the confirmation email.
#[instrument(skip(state, body))]
pub async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<Json<Value>> {
    let (user_id, item) = body.into_parts()?;
    let order_item = OrderService::new(state.store(), state.notifications())
        .create_order_item(user_id, &item)
        .await?;
    Ok(Json(json!({ "success": true, "msg": "Order created", "data": order_item })))
}

/// A buyer's order items, newest first.
#[instrument(skip(state))]
pub async fn orders(State(state): State<AppState>, Path(user_id): Path<String>) -> Result<Json<Value>> {
    let items = OrderService::silent(state.store())
        .list_for_user(user_segment(&user_id)?)
        .await?;
    Ok(Json(json!({ "success": true, "data": items })))
}
