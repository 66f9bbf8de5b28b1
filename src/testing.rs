use crate::catalog::{CatalogError, PageFetcher};
use crate::shop::api::{
    InventoryLevel, Location, NewProduct, ProductStatus, ProductUpdate, ShopError, ShopProduct,
    ShopVariant, Storefront, VariantUpdate,
};
use std::{collections::HashMap, net::SocketAddr, sync::Mutex};
use url::Url;

#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, Result<String, CatalogError>>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), Ok(body.into()));
        self
    }

    pub fn failure(mut self, url: &str, err: CatalogError) -> Self {
        self.pages.insert(url.to_string(), Err(err));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn search_hit(href: &str) -> String {
        format!(
            r#"<div class="c-suggest-popular dx_suggest-products">
                 <a class="c-option suggested-product" href="{href}">hit</a>
               </div>"#
        )
    }

    pub fn detail_page(description: &str, image: &str) -> String {
        format!(
            r#"<div id="dx-description-container"><p>{description}</p></div>
               <div class="dx_product-image__container"><img src="{image}"></div>"#
        )
    }
}

impl PageFetcher for FakeFetcher {
    async fn fetch_html(&self, url: &Url) -> Result<String, CatalogError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| Err(CatalogError::Network(format!("no route to {url}"))))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShopCall {
    Create { sku: String },
    Locations,
    SetInventory {
        location_id: i64,
        inventory_item_id: i64,
        available: i64,
    },
    Find(i64),
    SaveVariant { id: i64, price: Option<String> },
    SaveProduct { id: i64, status: Option<ProductStatus> },
}

#[derive(Default)]
pub struct FakeStorefront {
    locations: Vec<Location>,
    products: Mutex<HashMap<i64, ShopProduct>>,
    rejected_skus: HashMap<String, String>,
    rejected_saves: Option<String>,
    created: Mutex<Vec<NewProduct>>,
    calls: Mutex<Vec<ShopCall>>,
}

impl FakeStorefront {
    pub fn with_location(id: i64) -> Self {
        Self {
            locations: vec![Location {
                id,
                name: Some("Warehouse".into()),
            }],
            ..Self::default()
        }
    }

    pub fn with_product(self, id: i64, variant_ids: &[i64]) -> Self {
        let product = ShopProduct {
            id,
            status: Some("active".into()),
            variants: variant_ids
                .iter()
                .map(|&vid| ShopVariant {
                    id: vid,
                    price: Some("1.00".into()),
                    inventory_item_id: Some(vid * 10),
                })
                .collect(),
        };
        self.products.lock().unwrap().insert(id, product);
        self
    }

    pub fn reject_sku(mut self, sku: &str, message: &str) -> Self {
        self.rejected_skus
            .insert(sku.to_string(), message.to_string());
        self
    }

    pub fn reject_saves(mut self, message: &str) -> Self {
        self.rejected_saves = Some(message.to_string());
        self
    }

    pub fn created(&self) -> Vec<NewProduct> {
        self.created.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<ShopCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: ShopCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn save_result(&self) -> Result<(), ShopError> {
        match &self.rejected_saves {
            Some(message) => Err(ShopError::Validation(vec![message.clone()])),
            None => Ok(()),
        }
    }
}

impl Storefront for FakeStorefront {
    async fn create_product(&self, product: &NewProduct) -> Result<ShopProduct, ShopError> {
        let sku = product
            .variants
            .first()
            .map(|v| v.sku.clone())
            .unwrap_or_default();
        self.record(ShopCall::Create { sku: sku.clone() });
        if let Some(message) = self.rejected_skus.get(&sku) {
            return Err(ShopError::Validation(vec![message.clone()]));
        }

        let mut created = self.created.lock().unwrap();
        created.push(product.clone());
        let id = 1000 + created.len() as i64;
        let stored = ShopProduct {
            id,
            status: Some(product.status.to_string()),
            variants: vec![ShopVariant {
                id: id * 10 + 1,
                price: product.variants.first().map(|v| v.price.clone()),
                inventory_item_id: Some(id * 10),
            }],
        };
        self.products.lock().unwrap().insert(id, stored.clone());
        Ok(stored)
    }

    async fn locations(&self) -> Result<Vec<Location>, ShopError> {
        self.record(ShopCall::Locations);
        Ok(self.locations.clone())
    }

    async fn set_inventory_level(&self, level: &InventoryLevel) -> Result<(), ShopError> {
        self.record(ShopCall::SetInventory {
            location_id: level.location_id,
            inventory_item_id: level.inventory_item_id,
            available: level.available,
        });
        Ok(())
    }

    async fn find_product(&self, product_id: i64) -> Result<Option<ShopProduct>, ShopError> {
        self.record(ShopCall::Find(product_id));
        Ok(self.products.lock().unwrap().get(&product_id).cloned())
    }

    async fn save_variant(&self, update: &VariantUpdate) -> Result<(), ShopError> {
        self.record(ShopCall::SaveVariant {
            id: update.id,
            price: update.price.clone(),
        });
        self.save_result()
    }

    async fn save_product(&self, update: &ProductUpdate) -> Result<(), ShopError> {
        self.record(ShopCall::SaveProduct {
            id: update.id,
            status: update.status,
        });
        self.save_result()
    }
}

/// Serves `router` on an ephemeral local port for the rest of the test.
pub async fn serve_stub(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });
    addr
}
