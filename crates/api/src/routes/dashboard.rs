//! Merchant dashboard routes: profile, Printful link, imported products,
//! and order reporting.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use dmarketplace_core::{ApiKey, Email, ProductId, StoreId};

use crate::error::{AppError, Result};
use crate::middleware::{RequireAnyRole, RequireMerchant};
use crate::models::SellerProfileUpdate;
use crate::services::auth::{AuthError, Principal};
use crate::services::{CatalogService, OrderService, ProductOverrides, VerificationService};
use crate::state::AppState;

use super::merchant::seller_segment;
use super::validation::{Loose, id_segment, non_blank, positive_int};

/// Public profile of a seller.
#[instrument(skip(state))]
pub async fn seller_info(
    State(state): State<AppState>,
    Path(seller_id): Path<String>,
) -> Result<Json<Value>> {
    let seller = VerificationService::silent(state.store())
        .seller(seller_segment(&seller_id)?)
        .await?;
    Ok(Json(json!({ "success": true, "data": seller })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSellerRequest {
    shop_name: Option<String>,
    business_email: Option<String>,
    contact_number: Option<String>,
    description: Option<String>,
    business_address: Option<String>,
}

impl UpdateSellerRequest {
    fn into_update(self) -> Result<SellerProfileUpdate> {
        let business_email = non_blank(self.business_email.as_deref())
            .map(|email| Email::parse(&email))
            .transpose()
            .map_err(|e| AppError::BadRequest(format!("Invalid business email: {e}")))?;

        Ok(SellerProfileUpdate {
            shop_name: non_blank(self.shop_name.as_deref()),
            business_email,
            contact_number: non_blank(self.contact_number.as_deref()),
            description: non_blank(self.description.as_deref()),
            business_address: non_blank(self.business_address.as_deref()),
        })
    }
}

/// Update the merchant's own profile fields.
#[instrument(skip(state, body))]
pub async fn update_seller(
    State(state): State<AppState>,
    RequireMerchant(own): RequireMerchant,
    Path(seller_id): Path<String>,
    Json(body): Json<UpdateSellerRequest>,
) -> Result<Json<Value>> {
    let seller_id = seller_segment(&seller_id)?;
    Principal::Merchant { seller_id: own }.ensure_can_manage(seller_id)?;

    let update = body.into_update()?;
    if update.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }

    let seller = VerificationService::silent(state.store())
        .update_profile(seller_id, &update)
        .await?;
    Ok(Json(json!({ "success": true, "msg": "Seller updated", "data": seller })))
}

#[derive(Debug, Deserialize)]
pub struct ConnectPrintfulRequest {
    api_key: Option<String>,
    store_id: Option<Loose>,
}

/// Link a verified Printful key and store to the merchant.
#[instrument(skip(state, body))]
pub async fn connect_printful(
    State(state): State<AppState>,
    RequireMerchant(seller_id): RequireMerchant,
    Json(body): Json<ConnectPrintfulRequest>,
) -> Result<Json<Value>> {
    let api_key = non_blank(body.api_key.as_deref())
        .and_then(|key| ApiKey::parse(&key).ok())
        .ok_or_else(|| AppError::BadRequest("API key is required".to_string()))?;
    let store_id = StoreId::new(positive_int(
        body.store_id.as_ref(),
        "Invalid store ID provided",
    )?);

    let seller = CatalogService::new(state.store(), state.printful())
        .connect_printful(seller_id, &api_key, store_id)
        .await?;
    Ok(Json(json!({
        "success": true,
        "msg": "Printful store connected",
        "data": seller,
    })))
}

/// Products a seller has imported.
#[instrument(skip(state))]
pub async fn seller_products(
    State(state): State<AppState>,
    Path(seller_id): Path<String>,
) -> Result<Json<Value>> {
    let products = CatalogService::new(state.store(), state.printful())
        .products_for_seller(seller_segment(&seller_id)?)
        .await?;
    Ok(Json(json!({ "success": true, "data": products })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProductRequest {
    seller_id: Option<Loose>,
    external_product_id: Option<Loose>,
    description: Option<String>,
    price: Option<Loose>,
    quantity: Option<Loose>,
    category: Option<String>,
}

/// Import one Printful product into the merchant's catalog.
#[instrument(skip(state, body))]
pub async fn import_product(
    State(state): State<AppState>,
    RequireMerchant(own): RequireMerchant,
    Json(body): Json<ImportProductRequest>,
) -> Result<Json<Value>> {
    if let Some(requested) = body.seller_id.as_ref().and_then(Loose::integer)
        && requested != i64::from(own.as_i32())
    {
        return Err(AuthError::Forbidden("this store belongs to another merchant").into());
    }

    let external_product_id =
        positive_int(body.external_product_id.as_ref(), "Invalid product ID provided")?;
    let price = body
        .price
        .as_ref()
        .and_then(Loose::decimal)
        .ok_or_else(|| AppError::BadRequest("Price must be greater than 0".to_string()))?;
    let quantity = match body.quantity.as_ref() {
        None => 0,
        Some(q) => q
            .integer()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| AppError::BadRequest("Quantity must be a whole number".to_string()))?,
    };

    let overrides = ProductOverrides {
        description: body.description.unwrap_or_default(),
        price,
        quantity,
        category: body.category.unwrap_or_default(),
    };

    let product = CatalogService::new(state.store(), state.printful())
        .import_product(own, external_product_id, &overrides)
        .await?;
    Ok(Json(json!({ "success": true, "msg": "Product imported", "data": product })))
}

/// Delete one of the merchant's imported products.
#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireMerchant(seller_id): RequireMerchant,
    Path(product_id): Path<String>,
) -> Result<Json<Value>> {
    let product_id = ProductId::new(id_segment(&product_id, "Invalid product ID")?);
    CatalogService::new(state.store(), state.printful())
        .delete_product(product_id, &Principal::Merchant { seller_id })
        .await?;
    Ok(Json(json!({ "success": true, "msg": "Product deleted" })))
}

/// Product and revenue totals for a seller.
#[instrument(skip(state, principal))]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    RequireAnyRole(principal): RequireAnyRole,
    Path(seller_id): Path<String>,
) -> Result<Json<Value>> {
    let seller_id = seller_segment(&seller_id)?;
    principal.ensure_can_manage(seller_id)?;
    let stats = OrderService::silent(state.store())
        .dashboard_stats(seller_id)
        .await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentOrdersQuery {
    limit: Option<String>,
}

/// The seller's newest order items (`?limit=`, default 5, at most 100).
#[instrument(skip(state, principal))]
pub async fn recent_orders(
    State(state): State<AppState>,
    RequireAnyRole(principal): RequireAnyRole,
    Path(seller_id): Path<String>,
    Query(query): Query<RecentOrdersQuery>,
) -> Result<Json<Value>> {
    let seller_id = seller_segment(&seller_id)?;
    principal.ensure_can_manage(seller_id)?;
    let limit = query
        .limit
        .as_deref()
        .map(|l| {
            l.trim()
                .parse::<i64>()
                .map_err(|_| AppError::BadRequest("Invalid limit".to_string()))
        })
        .transpose()?;

    let orders = OrderService::silent(state.store())
        .recent_orders(seller_id, limit)
        .await?;
    Ok(Json(json!({ "success": true, "data": orders })))
}

/// Every order item placed against the seller's store.
#[instrument(skip(state, principal))]
pub async fn all_orders(
    State(state): State<AppState>,
    RequireAnyRole(principal): RequireAnyRole,
    Path(seller_id): Path<String>,
) -> Result<Json<Value>> {
    let seller_id = seller_segment(&seller_id)?;
    principal.ensure_can_manage(seller_id)?;
    let orders = OrderService::silent(state.store())
        .list_for_seller(seller_id, None)
        .await?;
    Ok(Json(json!({ "success": true, "data": orders })))
}
