use crate::catalog::CatalogError;
use crate::http::build_browser_client;
use reqwest::Client;
use std::future::Future;
use tracing::debug;
use url::Url;

/// Retrieves catalog pages as HTML text.
pub trait PageFetcher: Send + Sync {
    fn fetch_html(&self, url: &Url) -> impl Future<Output = Result<String, CatalogError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            http: build_browser_client(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch_html(&self, url: &Url) -> Result<String, CatalogError> {
        debug!(target = "gtinsync.catalog", %url, "fetching catalog page");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|err| CatalogError::Network(err.to_string()))?;

        if !response.status().is_success() {
            debug!(
                target = "gtinsync.catalog",
                %url,
                status = response.status().as_u16(),
                "catalog page rejected"
            );
            return Err(CatalogError::Status(response.status().as_u16()));
        }

        response
            .text()
            .await
            .map_err(|err| CatalogError::Network(err.to_string()))
    }
}
