use crate::shop::api::{
    InventoryLevel, NewImage, NewProduct, NewVariant, ProductStatus, ProductUpdate, ShopError,
    Storefront, VariantUpdate, format_price,
};
use tracing::{info, warn};

pub const TITLE_PREFIX: &str = "Test ";
const INVENTORY_MANAGEMENT: &str = "shopify";

/// Everything needed to list one row in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub sku: String,
    pub inventory: i64,
}

impl ProductDraft {
    fn to_new_product(&self) -> NewProduct {
        let images = self
            .image_url
            .as_deref()
            .filter(|src| !src.trim().is_empty())
            .map(|src| NewImage {
                src: src.to_string(),
            })
            .into_iter()
            .collect();
        NewProduct {
            title: format!("{TITLE_PREFIX}{}", self.name),
            body_html: self.description.clone(),
            status: ProductStatus::Active,
            variants: vec![NewVariant {
                price: format_price(self.price),
                sku: self.sku.clone(),
                inventory_management: INVENTORY_MANAGEMENT,
            }],
            images,
        }
    }
}

/// Creates an active product with one variant (and one image when the draft
/// has one), then stocks it at the store's first location.
///
/// The product is not removed again when the stocking step fails, so a
/// `LocationMissing` error can leave a created product behind.
pub async fn upload_product<S: Storefront>(
    storefront: &S,
    draft: &ProductDraft,
) -> Result<i64, ShopError> {
    let created = storefront.create_product(&draft.to_new_product()).await?;

    let inventory_item_id = created
        .variants
        .first()
        .and_then(|variant| variant.inventory_item_id)
        .ok_or_else(|| ShopError::Decode("created product has no inventory item".into()))?;

    let locations = storefront.locations().await?;
    let Some(location) = locations.first() else {
        warn!(
            target = "gtinsync.shop",
            product_id = created.id,
            sku = %draft.sku,
            "product created without inventory: no locations"
        );
        return Err(ShopError::LocationMissing);
    };

    storefront
        .set_inventory_level(&InventoryLevel {
            location_id: location.id,
            inventory_item_id,
            available: draft.inventory,
        })
        .await?;

    info!(
        target = "gtinsync.shop",
        product_id = created.id,
        location_id = location.id,
        "product uploaded"
    );
    Ok(created.id)
}

/// Sets `new_price` on every variant of a product and reports the outcome
/// as a sentence.
pub async fn update_product_price<S: Storefront>(
    storefront: &S,
    product_id: i64,
    new_price: f64,
) -> String {
    let product = match storefront.find_product(product_id).await {
        Ok(Some(product)) => product,
        Ok(None) => return format!("Product with ID {product_id} not found."),
        Err(err) => return format!("Error: {err}"),
    };

    let price = format_price(new_price);
    let result: Result<(), ShopError> = async {
        for variant in &product.variants {
            storefront
                .save_variant(&VariantUpdate {
                    id: variant.id,
                    price: Some(price.clone()),
                })
                .await?;
        }
        storefront
            .save_product(&ProductUpdate {
                id: product.id,
                status: None,
            })
            .await
    }
    .await;

    match result {
        Ok(()) => {
            format!("Price updated successfully to {new_price} for product ID {product_id}.")
        }
        Err(ShopError::Validation(messages)) => format!(
            "Failed to update price for product ID {product_id}: {}",
            messages.join("; ")
        ),
        Err(err) => format!("Error: {err}"),
    }
}

/// Moves a product to `status` (draft hides it from the storefront).
pub async fn deactivate_product<S: Storefront>(
    storefront: &S,
    product_id: i64,
    status: ProductStatus,
) -> String {
    let product = match storefront.find_product(product_id).await {
        Ok(Some(product)) => product,
        Ok(None) => return format!("Product with ID {product_id} not found."),
        Err(err) => return format!("Error while updating product status: {err}"),
    };

    let update = ProductUpdate {
        id: product.id,
        status: Some(status),
    };
    match storefront.save_product(&update).await {
        Ok(()) => format!("Product ID {product_id} has been set to status '{status}'."),
        Err(ShopError::Validation(messages)) => format!(
            "Failed to update product ID {product_id}: {}",
            messages.join("; ")
        ),
        Err(err) => format!("Error while updating product status: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeStorefront, ShopCall};

    fn draft() -> ProductDraft {
        ProductDraft {
            name: "Pen".into(),
            description: "Fine liner".into(),
            price: 14.0,
            image_url: Some("https://cdn.test/pen.jpg".into()),
            sku: "4006381333931".into(),
            inventory: 5,
        }
    }

    #[tokio::test]
    async fn upload_creates_product_and_sets_inventory() {
        let store = FakeStorefront::with_location(77);
        let id = upload_product(&store, &draft()).await.expect("upload");

        let created = store.created();
        assert_eq!(created.len(), 1);
        let product = &created[0];
        assert_eq!(product.title, "Test Pen");
        assert_eq!(product.body_html, "Fine liner");
        assert_eq!(product.status, ProductStatus::Active);
        assert_eq!(product.variants.len(), 1);
        assert_eq!(product.variants[0].price, "14.00");
        assert_eq!(product.variants[0].sku, "4006381333931");
        assert_eq!(product.variants[0].inventory_management, "shopify");
        assert_eq!(product.images.len(), 1);

        assert_eq!(
            store.calls().last(),
            Some(&ShopCall::SetInventory {
                location_id: 77,
                inventory_item_id: id * 10,
                available: 5,
            })
        );
    }

    #[tokio::test]
    async fn empty_image_is_not_attached() {
        let store = FakeStorefront::with_location(1);
        let mut draft = draft();
        draft.image_url = Some(String::new());
        upload_product(&store, &draft).await.expect("upload");
        assert!(store.created()[0].images.is_empty());
    }

    #[tokio::test]
    async fn rejected_product_returns_validation_messages() {
        let store = FakeStorefront::with_location(1).reject_sku("4006381333931", "title required");
        let err = upload_product(&store, &draft()).await.expect_err("rejected");
        assert_eq!(err, ShopError::Validation(vec!["title required".into()]));
        assert!(!store
            .calls()
            .iter()
            .any(|call| matches!(call, ShopCall::SetInventory { .. })));
    }

    #[tokio::test]
    async fn missing_location_fails_after_creation() {
        let store = FakeStorefront::default();
        let err = upload_product(&store, &draft()).await.expect_err("no location");
        assert_eq!(err, ShopError::LocationMissing);
        assert_eq!(err.to_string(), "No locations found for inventory.");
        // the remote product stays in place
        assert_eq!(store.created().len(), 1);
    }

    #[tokio::test]
    async fn price_update_saves_each_variant_then_product() {
        let store = FakeStorefront::default().with_product(5, &[51, 52]);
        let message = update_product_price(&store, 5, 19.5).await;
        assert_eq!(message, "Price updated successfully to 19.5 for product ID 5.");
        assert_eq!(
            store.calls(),
            vec![
                ShopCall::Find(5),
                ShopCall::SaveVariant {
                    id: 51,
                    price: Some("19.50".into())
                },
                ShopCall::SaveVariant {
                    id: 52,
                    price: Some("19.50".into())
                },
                ShopCall::SaveProduct {
                    id: 5,
                    status: None
                },
            ]
        );
    }

    #[tokio::test]
    async fn price_update_unknown_product() {
        let store = FakeStorefront::default();
        assert_eq!(
            update_product_price(&store, 9, 1.0).await,
            "Product with ID 9 not found."
        );
    }

    #[tokio::test]
    async fn deactivate_sets_status() {
        let store = FakeStorefront::default().with_product(5, &[51]);
        let message = deactivate_product(&store, 5, ProductStatus::default()).await;
        assert_eq!(message, "Product ID 5 has been set to status 'draft'.");
        assert_eq!(
            store.calls().last(),
            Some(&ShopCall::SaveProduct {
                id: 5,
                status: Some(ProductStatus::Draft)
            })
        );
    }

    #[tokio::test]
    async fn deactivate_reports_rejection() {
        let store = FakeStorefront::default()
            .with_product(5, &[51])
            .reject_saves("Status is invalid");
        let message = deactivate_product(&store, 5, ProductStatus::Archived).await;
        assert_eq!(message, "Failed to update product ID 5: Status is invalid");
    }
}
