use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static SUGGESTIONS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.c-suggest-popular.dx_suggest-products").unwrap());
static SUGGESTED_PRODUCT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.c-option.suggested-product").unwrap());

/// Pulls the first suggested product's link out of a search response.
///
/// Returns `None` when the popular-suggestions block, its product anchor or
/// the anchor's `href` is missing.
pub fn parse_product_link(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let container = document.select(&SUGGESTIONS).next()?;
    let anchor = container.select(&SUGGESTED_PRODUCT).next()?;
    anchor
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
}
