use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use std::{fmt, future::Future};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShopError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("resource not found")]
    NotFound,
    #[error("No locations found for inventory.")]
    LocationMissing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Archived => "archived",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewProduct {
    pub title: String,
    pub body_html: String,
    pub status: ProductStatus,
    pub variants: Vec<NewVariant>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<NewImage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewVariant {
    pub price: String,
    pub sku: String,
    pub inventory_management: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewImage {
    pub src: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopProduct {
    pub id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub variants: Vec<ShopVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopVariant {
    pub id: i64,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub inventory_item_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryLevel {
    pub location_id: i64,
    pub inventory_item_id: i64,
    pub available: i64,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct VariantUpdate {
    pub id: i64,
    pub price: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct ProductUpdate {
    pub id: i64,
    pub status: Option<ProductStatus>,
}

/// The admin resources the uploader needs from a store.
pub trait Storefront: Send + Sync {
    /// Persists a new product; a rejected payload is `ShopError::Validation`.
    fn create_product(
        &self,
        product: &NewProduct,
    ) -> impl Future<Output = Result<ShopProduct, ShopError>> + Send;

    fn locations(&self) -> impl Future<Output = Result<Vec<Location>, ShopError>> + Send;

    fn set_inventory_level(
        &self,
        level: &InventoryLevel,
    ) -> impl Future<Output = Result<(), ShopError>> + Send;

    /// `Ok(None)` when no product has that id.
    fn find_product(
        &self,
        product_id: i64,
    ) -> impl Future<Output = Result<Option<ShopProduct>, ShopError>> + Send;

    fn save_variant(
        &self,
        update: &VariantUpdate,
    ) -> impl Future<Output = Result<(), ShopError>> + Send;

    fn save_product(
        &self,
        update: &ProductUpdate,
    ) -> impl Future<Output = Result<(), ShopError>> + Send;
}

/// Two-decimal price string as the admin API expects it.
pub fn format_price(amount: f64) -> String {
    format!("{amount:.2}")
}

/// Flattens an admin API `errors` value into readable messages.
///
/// Field maps become `"<Field> <message>"`, with `base` messages left bare.
pub fn full_messages(errors: &Value) -> Vec<String> {
    match errors {
        Value::String(message) => vec![message.clone()],
        Value::Array(items) => items.iter().flat_map(full_messages).collect(),
        Value::Object(fields) => fields
            .iter()
            .flat_map(|(field, messages)| {
                full_messages(messages)
                    .into_iter()
                    .map(move |message| {
                        if field == "base" {
                            message
                        } else {
                            format!("{} {}", humanize(field), message)
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

fn humanize(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
