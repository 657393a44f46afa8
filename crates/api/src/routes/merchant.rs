//! Storefront-facing merchant routes: store applications, Printful catalog
//! proxying, cart lines, and store lookups.

use std::collections::HashMap;

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use dmarketplace_core::{
    ApiKey, CartItemId, Email, KybStatus, OrderItemId, OrderStatus, Price, SellerId, StoreId,
    UserId, WalletAddress,
};

use crate::db::SellerStore;
use crate::error::{AppError, Result};
use crate::middleware::RequireAnyRole;
use crate::models::{NewCartItem, NewSeller};
use crate::services::auth::Principal;
use crate::services::{
    CartService, CatalogService, OrderService, UploadError, UploadStore, VerificationService,
};
use crate::state::AppState;

use super::validation::{
    Loose, cart_limit, flag, id_segment, non_blank, optional_json, positive_id,
    positive_segment, quantity_or_one, required_text,
};

// =============================================================================
// Store applications
// =============================================================================

/// Fields and stored files of a `create-store` form.
#[derive(Default)]
struct Application {
    fields: HashMap<String, String>,
    logo_img: Option<String>,
    kyb_document: Option<String>,
    saved: Vec<String>,
}

impl Application {
    async fn read(&mut self, uploads: &UploadStore, multipart: &mut Multipart) -> Result<()> {
        while let Some(field) = multipart.next_field().await.map_err(UploadError::from)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "image" | "kybDocument" => {
                    // Browsers send an empty part when no file was chosen
                    if field.file_name().is_none_or(str::is_empty) {
                        continue;
                    }
                    let path = uploads.save_field(field).await?;
                    self.saved.push(path.clone());
                    if name == "image" {
                        self.logo_img = Some(path);
                    } else {
                        self.kyb_document = Some(path);
                    }
                }
                _ => {
                    let text = field.text().await.map_err(UploadError::from)?;
                    self.fields.insert(name, text);
                }
            }
        }
        Ok(())
    }

    fn field(&self, name: &str) -> Option<String> {
        non_blank(self.fields.get(name).map(String::as_str))
    }

    fn to_new_seller(&self) -> Result<NewSeller> {
        let kyb_documents = self
            .kyb_document
            .clone()
            .ok_or_else(|| AppError::BadRequest("kybDocument is required".to_string()))?;

        let shop_name = self
            .field("shopName")
            .ok_or_else(|| AppError::BadRequest("Shop name is required".to_string()))?;
        let wallet_address = WalletAddress::parse(&self.field("walletAddress").unwrap_or_default())
            .map_err(|e| AppError::BadRequest(format!("Invalid wallet address: {e}")))?;
        let business_email = Email::parse(&self.field("businessEmail").unwrap_or_default())
            .map_err(|e| AppError::BadRequest(format!("Invalid business email: {e}")))?;

        let printful_api_key = self
            .field("api_key")
            .map(|key| ApiKey::parse(&key))
            .transpose()
            .map_err(|e| AppError::BadRequest(format!("Invalid Printful API key: {e}")))?;
        let printful_store_id = self
            .field("store_id")
            .map(|id| positive_segment(&id, "Invalid store ID provided").map(StoreId::new))
            .transpose()?;

        let kyb_status = match self.field("status") {
            None => KybStatus::Pending,
            Some(status) => status
                .parse::<KybStatus>()
                .ok()
                .filter(|s| s.is_submittable())
                .ok_or_else(|| {
                    AppError::BadRequest("Status must be PENDING or UNDER_REVIEW".to_string())
                })?,
        };

        Ok(NewSeller {
            shop_name,
            wallet_address,
            business_email,
            description: self.field("description"),
            contact_number: self.field("contact"),
            business_address: self.field("address"),
            logo_img: self.logo_img.clone(),
            kyb_documents: Some(kyb_documents),
            printful_store_id,
            printful_api_key,
            kyb_status,
        })
    }
}

/// Submit a store application (multipart form).
///
/// Responds with the created seller and a merchant token for the dashboard.
/// Files stored for a rejected submission are removed.
#[instrument(skip(state, multipart))]
pub async fn create_store(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<Value>> {
    let uploads = state.uploads();
    let mut application = Application::default();

    let outcome = async {
        application.read(uploads, &mut multipart).await?;
        let new_seller = application.to_new_seller()?;
        let seller = VerificationService::new(state.store(), state.notifications())
            .submit(&new_seller)
            .await?;
        let token = state.tokens().issue(Principal::Merchant {
            seller_id: seller.id,
        })?;
        Ok::<_, AppError>((seller, token))
    }
    .await;

    match outcome {
        Ok((seller, token)) => Ok(Json(json!({
            "success": true,
            "msg": "wait for admin to review and allow your application",
            "data": seller,
            "token": token.token,
            "expiresAt": token.expires_at,
        }))),
        Err(e) => {
            uploads.remove(&application.saved).await;
            Err(e)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyApiKeyRequest {
    api_key: Option<String>,
}

/// Check a Printful API key and list the stores it reaches.
#[instrument(skip(state, body))]
pub async fn verify_printful_api(
    State(state): State<AppState>,
    Json(body): Json<VerifyApiKeyRequest>,
) -> Result<Json<Value>> {
    let api_key = non_blank(body.api_key.as_deref())
        .and_then(|key| ApiKey::parse(&key).ok())
        .ok_or_else(|| AppError::BadRequest("API key is required".to_string()))?;

    let stores = CatalogService::new(state.store(), state.printful())
        .verify_credential(&api_key)
        .await?;

    Ok(Json(json!({
        "success": true,
        "result": stores,
        "message": "API key verified successfully",
    })))
}

/// Approved stores for the storefront.
#[instrument(skip(state))]
pub async fn get_all_stores(State(state): State<AppState>) -> Result<Json<Value>> {
    let stores = VerificationService::silent(state.store())
        .list_approved()
        .await?;
    Ok(Json(json!({
        "success": true,
        "msg": "return all approved stores",
        "data": stores,
    })))
}

// =============================================================================
// Catalog proxy
// =============================================================================

/// Proxy a store's Printful product list.
#[instrument(skip(state))]
pub async fn store_products(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> Result<Json<Value>> {
    let store_id = StoreId::new(positive_segment(&store_id, "Invalid store ID provided")?);
    let data = CatalogService::new(state.store(), state.printful())
        .store_catalog(store_id)
        .await?;
    Ok(Json(json!({ "success": true, "msg": "store found", "data": data })))
}

/// One Printful product with its variants, plus the owning store.
#[instrument(skip(state))]
pub async fn single_product(
    State(state): State<AppState>,
    Path((store_id, product_id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let store_id = StoreId::new(positive_segment(&store_id, "Invalid store ID provided")?);
    let product_id = positive_segment(&product_id, "Invalid product ID provided")?;

    let detail = CatalogService::new(state.store(), state.printful())
        .product_detail(store_id, product_id)
        .await?;
    let store = state.store().seller_by_store(store_id).await?.map(|s| {
        json!({ "id": s.id, "shopName": s.shop_name, "logoImg": s.logo_img })
    });

    Ok(Json(json!({ "success": true, "data": detail, "store": store })))
}

// =============================================================================
// Cart lines
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    user_id: Option<Loose>,
    #[serde(rename = "variant_id")]
    variant_id: Option<Loose>,
    quantity: Option<Loose>,
    product_img: Option<Loose>,
    product_name: Option<Loose>,
    product_price: Option<Loose>,
}

/// Add a Printful variant to a buyer's cart.
///
/// Fields are checked in a fixed order and the first failure is reported.
#[instrument(skip(state, body))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    Path((store_id, product_id)): Path<(String, String)>,
    Json(body): Json<AddToCartRequest>,
) -> Result<Json<Value>> {
    let store_id = positive_segment(&store_id, "Invalid store ID provided")?;
    let product_id = positive_segment(&product_id, "Invalid product ID provided")?;
    let user_id = positive_id(body.user_id.as_ref(), "Invalid user ID provided")?;
    let variant_id = required_text(body.variant_id.as_ref(), "Invalid variant ID provided")?;
    let quantity = cart_limit(quantity_or_one(body.quantity.as_ref())?)?;

    let image_and_name = "Product image and name are required";
    let product_img = required_text(body.product_img.as_ref(), image_and_name)?;
    let product_name = required_text(body.product_name.as_ref(), image_and_name)?;

    let product_price = body
        .product_price
        .as_ref()
        .and_then(Loose::decimal)
        .and_then(|amount| Price::new(amount).ok())
        .ok_or_else(|| AppError::BadRequest("Invalid product price provided".to_string()))?;

    let item = NewCartItem {
        store_id: StoreId::new(store_id),
        product_id: product_id.to_string(),
        variant_id,
        product_img,
        product_name,
        product_price,
        quantity,
    };
    let line = CartService::new(state.store())
        .add_item(UserId::new(user_id), &item)
        .await?;

    Ok(Json(json!({
        "success": true,
        "msg": "Product added to cart successfully",
        "data": line,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveCartItemRequest {
    user_id: Option<Loose>,
}

/// Remove a cart line; with `userId`, only from that user's cart.
#[instrument(skip(state, body))]
pub async fn remove_cart_item(
    State(state): State<AppState>,
    Path(cart_item_id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>> {
    let cart_item_id = CartItemId::new(id_segment(&cart_item_id, "Invalid cart item ID")?);
    let body: RemoveCartItemRequest = optional_json(&body)?;
    let owner = body
        .user_id
        .as_ref()
        .map(|id| positive_id(Some(id), "Invalid user ID provided").map(UserId::new))
        .transpose()?;

    CartService::new(state.store())
        .remove_item(cart_item_id, owner)
        .await?;

    Ok(Json(json!({ "success": true, "msg": "product Deleted from the cart" })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetQuantityRequest {
    quantity: Option<Loose>,
    user_id: Option<Loose>,
}

/// Overwrite a cart line's quantity; with `userId`, only in that user's cart.
#[instrument(skip(state, body))]
pub async fn set_cart_item_quantity(
    State(state): State<AppState>,
    Path(cart_item_id): Path<String>,
    Json(body): Json<SetQuantityRequest>,
) -> Result<Json<Value>> {
    let cart_item_id = CartItemId::new(id_segment(&cart_item_id, "Invalid cart item ID")?);
    let quantity = cart_limit(positive_id(
        body.quantity.as_ref(),
        "Quantity must be a positive number",
    )?)?;
    let owner = body
        .user_id
        .as_ref()
        .map(|id| positive_id(Some(id), "Invalid user ID provided").map(UserId::new))
        .transpose()?;

    let line = CartService::new(state.store())
        .set_quantity(cart_item_id, quantity, owner)
        .await?;

    Ok(Json(json!({
        "success": true,
        "msg": "quantity in the cart updated",
        "data": line,
    })))
}

// =============================================================================
// Store lookups
// =============================================================================

/// Payout wallet of the seller behind a Printful store.
#[instrument(skip(state))]
pub async fn store_wallet(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> Result<Json<Value>> {
    let store_id = StoreId::new(positive_segment(&store_id, "Invalid store ID provided")?);
    let wallet = CatalogService::new(state.store(), state.printful())
        .wallet_for_store(store_id)
        .await?;
    Ok(Json(json!({ "msg": "wallet address found", "walletAddress": wallet })))
}

/// The stored Printful key of a store; its merchant or an admin only.
#[instrument(skip(state, principal))]
pub async fn store_api_key(
    State(state): State<AppState>,
    RequireAnyRole(principal): RequireAnyRole,
    Path(store_id): Path<String>,
) -> Result<Json<Value>> {
    let store_id = StoreId::new(positive_segment(&store_id, "Invalid store ID provided")?);
    let api_key = CatalogService::new(state.store(), state.printful())
        .api_key_for_store(store_id, &principal)
        .await?;
    Ok(Json(json!({ "apiKey": api_key.expose() })))
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusRequest {
    status: Option<String>,
    force: Option<Loose>,
}

/// Move an order item along its lifecycle.
#[instrument(skip(state, principal, body))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAnyRole(principal): RequireAnyRole,
    Path(order_item_id): Path<String>,
    Json(body): Json<OrderStatusRequest>,
) -> Result<Json<Value>> {
    let order_item_id = OrderItemId::new(id_segment(&order_item_id, "Invalid order item ID")?);
    let status = body
        .status
        .as_deref()
        .and_then(|s| s.parse::<OrderStatus>().ok())
        .ok_or_else(|| AppError::BadRequest("Invalid order status".to_string()))?;

    let order_item = OrderService::new(state.store(), state.notifications())
        .update_status(order_item_id, status, &principal, flag(body.force.as_ref()))
        .await?;

    Ok(Json(json!({ "success": true, "orderItem": order_item })))
}

/// A seller id from a path segment.
pub(super) fn seller_segment(segment: &str) -> Result<SellerId> {
    id_segment(segment, "Invalid seller ID").map(SellerId::new)
}
