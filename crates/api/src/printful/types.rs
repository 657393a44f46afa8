//! Printful API payloads.
//!
//! Only the fields the marketplace reads are typed; everything else is kept in
//! `extra` so proxied responses reach the storefront unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Printful wraps every response as `{ "code": ..., "result": ... }`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub result: T,
}

/// A store reachable with an API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintfulStore {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub store_type: Option<String>,
}

/// A synced product, as listed under a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncProduct {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub variants: i32,
    #[serde(default)]
    pub synced: i32,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One product with its variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub sync_product: SyncProduct,
    #[serde(default)]
    pub sync_variants: Vec<Value>,
}
