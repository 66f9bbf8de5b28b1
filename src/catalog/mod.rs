pub mod config;
pub mod details;
pub mod fetch;
pub mod lookup;

pub use details::ProductDetails;
pub use fetch::{HttpFetcher, PageFetcher};

use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("invalid url `{0}`")]
    InvalidUrl(String),
}

#[derive(Debug, Clone)]
pub struct Catalog<F = HttpFetcher> {
    fetcher: F,
    search_url: Url,
}

impl Catalog<HttpFetcher> {
    pub fn from_env() -> Result<Self, CatalogError> {
        Self::new(HttpFetcher::new(), config::SEARCH_URL.as_str())
    }
}

impl<F> Catalog<F> {
    #[cfg(test)]
    pub(crate) fn fetcher(&self) -> &F {
        &self.fetcher
    }
}

impl<F: PageFetcher> Catalog<F> {
    pub fn new(fetcher: F, search_url: &str) -> Result<Self, CatalogError> {
        let search_url =
            Url::parse(search_url).map_err(|_| CatalogError::InvalidUrl(search_url.to_string()))?;
        Ok(Self {
            fetcher,
            search_url,
        })
    }

    pub fn search_url_for(&self, gtin: &str) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut().append_pair("keyword", gtin);
        url
    }

    pub async fn product_link(&self, gtin: &str) -> Result<Option<String>, CatalogError> {
        let url = self.search_url_for(gtin);
        let body = self.fetcher.fetch_html(&url).await?;
        Ok(lookup::parse_product_link(&body))
    }

    pub async fn product_details(&self, link: &str) -> Result<ProductDetails, CatalogError> {
        // relative links resolve against the search endpoint's origin
        let url = self
            .search_url
            .join(link)
            .map_err(|_| CatalogError::InvalidUrl(link.to_string()))?;
        let body = self.fetcher.fetch_html(&url).await?;
        Ok(details::parse_product_details(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeFetcher;

    const SEARCH: &str = "https://catalog.test/api/search";

    #[test]
    fn search_url_encodes_keyword() {
        let catalog = Catalog::new(FakeFetcher::default(), SEARCH).unwrap();
        assert_eq!(
            catalog.search_url_for("40 06").as_str(),
            "https://catalog.test/api/search?keyword=40+06"
        );
    }

    #[tokio::test]
    async fn product_link_found_and_missing() {
        let fetcher = FakeFetcher::default()
            .page(
                "https://catalog.test/api/search?keyword=111",
                FakeFetcher::search_hit("/p/one"),
            )
            .page(
                "https://catalog.test/api/search?keyword=222",
                "<div>nothing</div>",
            );
        let catalog = Catalog::new(fetcher, SEARCH).unwrap();

        assert_eq!(
            catalog.product_link("111").await,
            Ok(Some("/p/one".to_string()))
        );
        assert_eq!(catalog.product_link("222").await, Ok(None));
    }

    #[tokio::test]
    async fn product_link_propagates_transport_errors() {
        let fetcher = FakeFetcher::default().failure(
            "https://catalog.test/api/search?keyword=333",
            CatalogError::Status(503),
        );
        let catalog = Catalog::new(fetcher, SEARCH).unwrap();
        assert_eq!(
            catalog.product_link("333").await,
            Err(CatalogError::Status(503))
        );
    }

    #[tokio::test]
    async fn product_details_resolves_relative_links() {
        let fetcher = FakeFetcher::default().page(
            "https://catalog.test/p/one",
            FakeFetcher::detail_page("D1", "I1"),
        );
        let catalog = Catalog::new(fetcher, SEARCH).unwrap();
        let details = catalog.product_details("/p/one").await.expect("details");
        assert_eq!(details.description, "D1");
        assert_eq!(details.image_url.as_deref(), Some("I1"));
    }
}
