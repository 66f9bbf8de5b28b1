use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#dx-description-container").unwrap());
static IMAGE_CONTAINER: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.dx_product-image__container").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

/// Enrichment scraped from a catalog detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDetails {
    /// Description text; empty when the page has no description block.
    pub description: String,
    pub image_url: Option<String>,
}

pub fn parse_product_details(body: &str) -> ProductDetails {
    let document = Html::parse_document(body);

    // text nodes are trimmed and glued without separators
    let description = document
        .select(&DESCRIPTION)
        .next()
        .map(|container| {
            container
                .text()
                .map(str::trim)
                .filter(|piece| !piece.is_empty())
                .collect::<String>()
        })
        .unwrap_or_default();

    let image_url = document
        .select(&IMAGE_CONTAINER)
        .next()
        .and_then(|container| container.select(&IMAGE).next())
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string);

    ProductDetails {
        description,
        image_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_description_and_image() {
        let body = r#"
            <html><body>
              <div class="dx_product-image__container">
                <picture><img src="https://cdn.deloox.se/pen.jpg" alt="Pen"></picture>
              </div>
              <div id="dx-description-container">
                <h2> Stabilo point 88 </h2>
                <p>Fine liner
                </p>
              </div>
            </body></html>"#;
        let details = parse_product_details(body);
        assert_eq!(details.description, "Stabilo point 88Fine liner");
        assert_eq!(
            details.image_url.as_deref(),
            Some("https://cdn.deloox.se/pen.jpg")
        );
    }

    #[test]
    fn missing_description_is_empty_not_absent() {
        let body = r#"<div class="dx_product-image__container"><img src="a.jpg"></div>"#;
        let details = parse_product_details(body);
        assert_eq!(details.description, "");
        assert_eq!(details.image_url.as_deref(), Some("a.jpg"));
    }

    #[test]
    fn image_container_without_img() {
        let body = r#"
            <div id="dx-description-container">Text</div>
            <div class="dx_product-image__container"><span>no image</span></div>"#;
        let details = parse_product_details(body);
        assert_eq!(details.description, "Text");
        assert_eq!(details.image_url, None);
    }
}
