use crate::http::build_client;
use crate::shop::api::{
    InventoryLevel, Location, NewProduct, ProductUpdate, ShopError, ShopProduct, Storefront,
    VariantUpdate, full_messages,
};
use crate::shop::config::ShopCredentials;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, info};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// An authenticated connection to one store's admin API.
///
/// Opened for a batch and released when dropped, so the credentials never
/// outlive the work that needed them.
pub struct ShopSession {
    http: Client,
    base: String,
    credentials: ShopCredentials,
}

impl ShopSession {
    pub fn open(credentials: ShopCredentials) -> Self {
        info!(
            target = "gtinsync.shop",
            shop = %credentials.shop_url,
            api_version = %credentials.api_version,
            "shop session opened"
        );
        Self {
            http: build_client(),
            base: credentials.admin_base(),
            credentials,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base, path);
        debug!(target = "gtinsync.shop", %method, %url, "admin request");
        self.http
            .request(method, url)
            .header(ACCESS_TOKEN_HEADER, &self.credentials.api_token)
    }
}

impl Drop for ShopSession {
    fn drop(&mut self) {
        info!(
            target = "gtinsync.shop",
            shop = %self.credentials.shop_url,
            "shop session released"
        );
    }
}

async fn send(builder: RequestBuilder) -> Result<Response, ShopError> {
    let response = builder
        .send()
        .await
        .map_err(|err| ShopError::Network(err.to_string()))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ShopError::NotFound);
    }
    if status == StatusCode::UNPROCESSABLE_ENTITY {
        let body: Value = response
            .json()
            .await
            .map_err(|err| ShopError::Decode(err.to_string()))?;
        let messages = full_messages(body.get("errors").unwrap_or(&body));
        return Err(ShopError::Validation(messages));
    }
    Err(ShopError::Status(status.as_u16()))
}

async fn read<T: DeserializeOwned>(response: Response) -> Result<T, ShopError> {
    response
        .json::<T>()
        .await
        .map_err(|err| ShopError::Decode(err.to_string()))
}

#[derive(Deserialize)]
struct ProductEnvelope {
    product: ShopProduct,
}

#[derive(Deserialize)]
struct LocationsEnvelope {
    #[serde(default)]
    locations: Vec<Location>,
}

impl Storefront for ShopSession {
    async fn create_product(&self, product: &NewProduct) -> Result<ShopProduct, ShopError> {
        let response = send(
            self.request(reqwest::Method::POST, "products.json")
                .json(&json!({ "product": product })),
        )
        .await?;
        Ok(read::<ProductEnvelope>(response).await?.product)
    }

    async fn locations(&self) -> Result<Vec<Location>, ShopError> {
        let response = send(self.request(reqwest::Method::GET, "locations.json")).await?;
        Ok(read::<LocationsEnvelope>(response).await?.locations)
    }

    async fn set_inventory_level(&self, level: &InventoryLevel) -> Result<(), ShopError> {
        send(self.request(reqwest::Method::POST, "inventory_levels/set.json").json(level))
            .await?;
        Ok(())
    }

    async fn find_product(&self, product_id: i64) -> Result<Option<ShopProduct>, ShopError> {
        let path = format!("products/{product_id}.json");
        match send(self.request(reqwest::Method::GET, &path)).await {
            Ok(response) => Ok(Some(read::<ProductEnvelope>(response).await?.product)),
            Err(ShopError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn save_variant(&self, update: &VariantUpdate) -> Result<(), ShopError> {
        let path = format!("variants/{}.json", update.id);
        send(self.request(reqwest::Method::PUT, &path).json(&json!({ "variant": update }))).await?;
        Ok(())
    }

    async fn save_product(&self, update: &ProductUpdate) -> Result<(), ShopError> {
        let path = format!("products/{}.json", update.id);
        send(self.request(reqwest::Method::PUT, &path).json(&json!({ "product": update }))).await?;
        Ok(())
    }
}
